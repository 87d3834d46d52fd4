use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
#[error("Healthcheck failed: {0}")]
pub struct HealthcheckError(String);

/// Perform a health check against a specific port
pub async fn healthcheck_with_port(port: u16) -> Result<(), HealthcheckError> {
    check_health(&format!("http://127.0.0.1:{port}/v1/health"), false).await
}

/// Health check against a receiver serving HTTPS. The certificate is not
/// verified; only the local listener's answer matters.
pub async fn healthcheck_tls_with_port(port: u16) -> Result<(), HealthcheckError> {
    check_health(&format!("https://127.0.0.1:{port}/v1/health"), true).await
}

async fn check_health(url: &str, accept_invalid_certs: bool) -> Result<(), HealthcheckError> {
    let client = reqwest::Client::builder()
        .use_rustls_tls()
        .danger_accept_invalid_certs(accept_invalid_certs)
        .timeout(Duration::from_secs(2))
        .build()
        .map_err(|e| HealthcheckError(format!("Failed to create HTTP client: {e}")))?;

    let resp = client
        .get(url)
        .send()
        .await
        .map_err(|e| HealthcheckError(format!("Request failed: {e}")))?;

    if resp.status().is_success() {
        Ok(())
    } else {
        Err(HealthcheckError(format!(
            "Health endpoint returned status: {}",
            resp.status()
        )))
    }
}
