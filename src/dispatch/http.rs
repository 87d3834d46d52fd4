//! OTLP/HTTP sender built on a pooled `reqwest` client.

use std::time::Duration;

use reqwest::header::{CONTENT_ENCODING, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Certificate, Client, ClientBuilder, Identity, Proxy};
use tracing::debug;
use url::Url;

use super::config::TlsSettings;
use super::tls::TlsMaterial;
use super::{Delivery, ResponseCode, TransportError};
use crate::codec::{CONTENT_ENCODING_GZIP, CONTENT_TYPE_PROTOBUF, WireFormat, response};
use crate::domain::SignalKind;

// Upstream error bodies are only kept for log context.
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: Url,
}

impl HttpTransport {
    pub fn new(
        endpoint: Url,
        proxy: Option<&Url>,
        tls: Option<&TlsSettings>,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_PROTOBUF));

        let mut builder = ClientBuilder::new()
            .use_rustls_tls()
            .timeout(timeout)
            .connect_timeout(timeout)
            .default_headers(default_headers)
            .user_agent(concat!("rask-otlp-gateway/", env!("CARGO_PKG_VERSION")));

        if let Some(proxy) = proxy {
            builder = builder.proxy(Proxy::all(proxy.as_str()).map_err(TransportError::Client)?);
        }

        if let Some(tls) = tls {
            let material = TlsMaterial::load(tls)?;
            if let Some(bundle) = material.identity_bundle() {
                builder = builder.identity(Identity::from_pem(&bundle)?);
            }
            if let Some(ca) = &material.ca_pem {
                builder = builder.add_root_certificate(Certificate::from_pem(ca)?);
            }
            if let Some(min) = tls.min_version {
                builder = builder.min_tls_version(min.as_reqwest());
            }
            if let Some(max) = tls.max_version {
                builder = builder.max_tls_version(max.as_reqwest());
            }
            builder = builder.danger_accept_invalid_certs(tls.insecure);
        }

        let client = builder.build()?;
        Ok(Self { client, endpoint })
    }

    /// `{endpoint}/v1/{logs|metrics|traces}`, keeping any base path.
    #[must_use]
    pub fn url_for(&self, kind: SignalKind) -> String {
        format!(
            "{}{}",
            self.endpoint.as_str().trim_end_matches('/'),
            kind.path()
        )
    }

    pub async fn send(&self, kind: SignalKind, body: Vec<u8>, gzipped: bool) -> Delivery {
        let url = self.url_for(kind);
        let mut request = self.client.post(&url).body(body);
        if gzipped {
            request = request.header(CONTENT_ENCODING, CONTENT_ENCODING_GZIP);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                return Delivery::Unreachable {
                    message: e.to_string(),
                };
            }
        };

        let status = response.status();
        let format = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(WireFormat::from_content_type)
            .unwrap_or(WireFormat::Protobuf);
        let body = response.bytes().await.unwrap_or_default();
        debug!(url = %url, status = status.as_u16(), bytes = body.len(), "OTLP/HTTP response");

        if status.is_success() {
            Delivery::Acknowledged {
                partial: response::parse_partial_success(kind, &body, format),
            }
        } else {
            let end = body.len().min(MAX_ERROR_BODY);
            Delivery::Rejected {
                code: ResponseCode::Http(status.as_u16()),
                message: String::from_utf8_lossy(&body[..end]).into_owned(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport(endpoint: &str) -> HttpTransport {
        HttpTransport::new(
            Url::parse(endpoint).unwrap(),
            None,
            None,
            Duration::from_secs(1),
        )
        .unwrap()
    }

    #[test]
    fn test_url_for_appends_signal_path() {
        let t = transport("http://127.0.0.1:4318");
        assert_eq!(t.url_for(SignalKind::Logs), "http://127.0.0.1:4318/v1/logs");
        assert_eq!(
            t.url_for(SignalKind::Metrics),
            "http://127.0.0.1:4318/v1/metrics"
        );
    }

    #[test]
    fn test_url_for_keeps_base_path() {
        let t = transport("https://collector.example.com/otlp/");
        assert_eq!(
            t.url_for(SignalKind::Traces),
            "https://collector.example.com/otlp/v1/traces"
        );
    }
}
