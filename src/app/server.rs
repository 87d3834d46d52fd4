use std::time::Duration;

use axum::Router;
use axum_server::Handle;
use axum_server::tls_rustls::RustlsConfig;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::{ReceiverSettings, ReceiverTlsSettings};
use crate::error::GatewayError;

/// How long in-flight requests get to finish once shutdown starts (TLS listener).
const GRACEFUL_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Serve the receiver until SIGINT/SIGTERM or until `shutdown_token` is
/// cancelled. A signal cancels the token.
pub async fn serve(
    app: Router,
    receiver: &ReceiverSettings,
    shutdown_token: CancellationToken,
) -> Result<(), GatewayError> {
    let bind_addr = receiver.bind_address();

    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        tokio::select! {
            () = shutdown_signal() => signal_token.cancel(),
            () = signal_token.cancelled() => {}
        }
    });

    match &receiver.tls {
        None => serve_plain(app, &bind_addr, shutdown_token).await?,
        Some(tls) => serve_tls(app, &bind_addr, tls, shutdown_token).await?,
    }

    info!("Server shutdown complete");
    Ok(())
}

async fn serve_plain(
    app: Router,
    bind_addr: &str,
    shutdown_token: CancellationToken,
) -> Result<(), GatewayError> {
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .map_err(|e| GatewayError::Bind {
            address: bind_addr.to_string(),
            source: e,
        })?;
    info!("OTLP HTTP server listening on {}", listener.local_addr()?);
    log_endpoints();

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_token.cancelled_owned())
        .await?;
    Ok(())
}

async fn serve_tls(
    app: Router,
    bind_addr: &str,
    tls: &ReceiverTlsSettings,
    shutdown_token: CancellationToken,
) -> Result<(), GatewayError> {
    let config = RustlsConfig::from_pem_file(&tls.cert_path, &tls.private_key_path)
        .await
        .map_err(|e| GatewayError::Config(format!("Failed to load receiver TLS material: {e}")))?;

    let addr = tokio::net::lookup_host(bind_addr)
        .await
        .map_err(|e| GatewayError::Bind {
            address: bind_addr.to_string(),
            source: e,
        })?
        .next()
        .ok_or_else(|| GatewayError::Config(format!("Bind address {bind_addr} did not resolve")))?;

    let handle = Handle::new();
    let shutdown_handle = handle.clone();
    tokio::spawn(async move {
        shutdown_token.cancelled().await;
        shutdown_handle.graceful_shutdown(Some(GRACEFUL_SHUTDOWN_TIMEOUT));
    });

    info!("OTLP HTTPS server listening on {addr}");
    log_endpoints();

    axum_server::bind_rustls(addr, config)
        .handle(handle)
        .serve(app.into_make_service())
        .await
        .map_err(|e| GatewayError::Bind {
            address: addr.to_string(),
            source: e,
        })
}

fn log_endpoints() {
    info!("  - GET  /v1/health     (health check)");
    info!("  - POST /v1/logs       (OTLP logs)");
    info!("  - POST /v1/metrics    (OTLP metrics)");
    info!("  - POST /v1/traces     (OTLP traces)");
}

/// Wait for SIGTERM or SIGINT (Ctrl+C) for graceful shutdown.
pub(crate) async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received SIGINT, initiating graceful shutdown"),
        () = terminate => info!("Received SIGTERM, initiating graceful shutdown"),
    }
}
