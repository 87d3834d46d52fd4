mod router;
pub mod server;
mod state;
pub mod tracing;

use clap::Parser;
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;

use crate::adapter::pump_lines;
use crate::config::{Cli, Command, Settings};
use crate::error::GatewayError;
use crate::otlp::OTLPState;

pub use router::main_router;
pub use state::AppState;

/// Tag used for bare records read from stdin in forwarder-only mode.
const STDIN_TAG: &str = "otlp.stdin";

/// Application entry point. Initializes tracing and configuration, then runs
/// the receiver, the forwarder, or both until shutdown.
pub async fn run() -> Result<(), GatewayError> {
    let cli = Cli::parse();

    // Healthcheck subcommand (for Docker healthcheck in distroless image)
    if let Some(Command::Healthcheck { port, tls }) = cli.command {
        let result = if tls {
            crate::healthcheck::healthcheck_tls_with_port(port).await
        } else {
            crate::healthcheck_with_port(port).await
        };
        match result {
            Ok(()) => std::process::exit(0),
            Err(e) => {
                eprintln!("{e}");
                std::process::exit(1)
            }
        }
    }

    tracing::init_tracing(cli.log_level.into());

    // Both reqwest's and axum-server's rustls configs use the process default.
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let settings = Settings::load(cli.config.as_deref())
        .map_err(|e| GatewayError::Config(e.to_string()))?;
    ::tracing::info!(
        receiver = settings.receiver.is_some(),
        forwarder = settings.forwarder.is_some(),
        "Loaded settings"
    );

    let shutdown_token = CancellationToken::new();
    let app_state = AppState::from_settings(&settings)?;

    let result = match &settings.receiver {
        Some(receiver) => {
            let otlp_state = OTLPState::new(app_state.sink.clone(), receiver.tag.as_str());
            server::serve(main_router(otlp_state), receiver, shutdown_token).await
        }
        None => forward_stdin(&app_state).await,
    };

    app_state.shutdown().await;
    result
}

/// Forwarder-only mode: stored records are read from stdin until EOF or a
/// shutdown signal.
async fn forward_stdin(app_state: &AppState) -> Result<(), GatewayError> {
    let reader = BufReader::new(tokio::io::stdin());
    tokio::select! {
        result = pump_lines(reader, app_state.sink.as_ref(), STDIN_TAG) => {
            result.map_err(|e| GatewayError::Server(std::io::Error::other(e)))?;
        }
        () = server::shutdown_signal() => {}
    }
    Ok(())
}
