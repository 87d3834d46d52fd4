mod common;

use std::net::{SocketAddr, TcpListener};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum_server::Handle;
use axum_server::tls_rustls::RustlsConfig;

use opentelemetry_proto::tonic::collector::logs::v1::{
    ExportLogsPartialSuccess, ExportLogsServiceRequest, ExportLogsServiceResponse,
    logs_service_server::{LogsService, LogsServiceServer},
};
use rask_otlp_gateway::dispatch::{
    Compression, Dispatcher, ExportOutcome, ResponseCode, TlsSettings, TlsVersion,
    TransportConfig,
};
use tokio::sync::oneshot;
use tonic::codec::CompressionEncoding;
use tonic::{Code, Request, Response, Status};

/// Collector stub: records requests and answers with a fixed result.
#[derive(Clone)]
struct StubCollector {
    received: Arc<Mutex<Vec<ExportLogsServiceRequest>>>,
    reply: Result<Option<ExportLogsPartialSuccess>, Code>,
}

#[tonic::async_trait]
impl LogsService for StubCollector {
    async fn export(
        &self,
        request: Request<ExportLogsServiceRequest>,
    ) -> Result<Response<ExportLogsServiceResponse>, Status> {
        self.received.lock().unwrap().push(request.into_inner());
        match &self.reply {
            Ok(partial_success) => Ok(Response::new(ExportLogsServiceResponse {
                partial_success: partial_success.clone(),
            })),
            Err(code) => Err(Status::new(*code, "stub rejection")),
        }
    }
}

struct RunningCollector {
    endpoint: String,
    received: Arc<Mutex<Vec<ExportLogsServiceRequest>>>,
    shutdown: oneshot::Sender<()>,
}

async fn start_collector(reply: Result<Option<ExportLogsPartialSuccess>, Code>) -> RunningCollector {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    drop(listener);

    let received = Arc::new(Mutex::new(Vec::new()));
    let stub = StubCollector {
        received: received.clone(),
        reply,
    };
    let (shutdown, rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        tonic::transport::Server::builder()
            .add_service(LogsServiceServer::new(stub).accept_compressed(CompressionEncoding::Gzip))
            .serve_with_shutdown(addr, async {
                let _ = rx.await;
            })
            .await
            .unwrap();
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    RunningCollector {
        endpoint: format!("http://{addr}"),
        received,
        shutdown,
    }
}

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/tls")
        .join(name)
}

/// Same collector behind rustls, with a certificate issued by the test CA
/// for 127.0.0.1.
async fn start_tls_collector() -> (RunningTlsCollector, Arc<Mutex<Vec<ExportLogsServiceRequest>>>) {
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
    let config = RustlsConfig::from_pem_file(fixture("server.pem"), fixture("server.key"))
        .await
        .unwrap();

    let received = Arc::new(Mutex::new(Vec::new()));
    let router = tonic::service::Routes::new(LogsServiceServer::new(StubCollector {
        received: received.clone(),
        reply: Ok(None),
    }))
    .into_axum_router();

    let handle = Handle::new();
    let server_handle = handle.clone();
    tokio::spawn(async move {
        axum_server::bind_rustls("127.0.0.1:0".parse().unwrap(), config)
            .handle(server_handle)
            .serve(router.into_make_service())
            .await
            .unwrap();
    });
    let addr = handle.listening().await.unwrap();

    (
        RunningTlsCollector {
            endpoint: format!("https://127.0.0.1:{}", addr.port()),
            handle,
        },
        received,
    )
}

struct RunningTlsCollector {
    endpoint: String,
    handle: Handle,
}

impl Drop for RunningTlsCollector {
    fn drop(&mut self) {
        self.handle.shutdown();
    }
}

fn config(endpoint: &str) -> TransportConfig {
    TransportConfig::grpc(endpoint).with_timeout(Duration::from_secs(2))
}

#[tokio::test]
async fn test_grpc_ok_is_success() {
    let collector = start_collector(Ok(None)).await;
    let dispatcher = Dispatcher::new(config(&collector.endpoint)).unwrap();

    let outcome = dispatcher.dispatch(&common::stored_logs(3)).await;

    assert_eq!(outcome, ExportOutcome::Success);
    assert_eq!(
        collector.received.lock().unwrap().as_slice(),
        &[common::logs_request(3)]
    );
    let _ = collector.shutdown.send(());
}

#[tokio::test]
async fn test_grpc_gzip_is_accepted() {
    let collector = start_collector(Ok(None)).await;
    let dispatcher =
        Dispatcher::new(config(&collector.endpoint).with_compression(Compression::Gzip)).unwrap();

    assert!(dispatcher.dispatch(&common::stored_logs(2)).await.is_success());
    assert_eq!(collector.received.lock().unwrap().len(), 1);
    let _ = collector.shutdown.send(());
}

#[tokio::test]
async fn test_grpc_partial_success_is_success() {
    let collector = start_collector(Ok(Some(ExportLogsPartialSuccess {
        rejected_log_records: 1,
        error_message: "one bad record".to_string(),
    })))
    .await;
    let dispatcher = Dispatcher::new(config(&collector.endpoint)).unwrap();

    assert!(dispatcher.dispatch(&common::stored_logs(2)).await.is_success());
    let _ = collector.shutdown.send(());
}

#[tokio::test]
async fn test_grpc_error_status_is_fatal_by_default() {
    let collector = start_collector(Err(Code::InvalidArgument)).await;
    let dispatcher = Dispatcher::new(config(&collector.endpoint)).unwrap();

    let outcome = dispatcher.dispatch(&common::stored_logs(1)).await;

    assert!(outcome.is_fatal());
    let _ = collector.shutdown.send(());
}

#[tokio::test]
async fn test_grpc_status_matches_retryable_set_by_http_equivalent() {
    let collector = start_collector(Err(Code::ResourceExhausted)).await;
    let dispatcher =
        Dispatcher::new(config(&collector.endpoint).with_retryable_codes([429])).unwrap();

    let outcome = dispatcher.dispatch(&common::stored_logs(1)).await;

    assert!(matches!(
        outcome,
        ExportOutcome::RetryableFailure {
            code: Some(ResponseCode::Grpc(Code::ResourceExhausted)),
            ..
        }
    ));
    let _ = collector.shutdown.send(());
}

#[tokio::test]
async fn test_grpc_tls_with_ca_is_success() {
    let (collector, received) = start_tls_collector().await;
    let tls = TlsSettings {
        ca_path: Some(fixture("ca.pem")),
        min_version: Some(TlsVersion::Tls1_3),
        ..Default::default()
    };
    let dispatcher = Dispatcher::new(config(&collector.endpoint).with_tls(tls)).unwrap();

    assert_eq!(
        dispatcher.dispatch(&common::stored_logs(2)).await,
        ExportOutcome::Success
    );
    assert_eq!(received.lock().unwrap().as_slice(), &[common::logs_request(2)]);
}

#[tokio::test]
async fn test_grpc_tls_unknown_issuer_is_retryable() {
    let (collector, received) = start_tls_collector().await;
    let dispatcher =
        Dispatcher::new(config(&collector.endpoint).with_tls(TlsSettings::default())).unwrap();

    let outcome = dispatcher.dispatch(&common::stored_logs(1)).await;

    assert!(outcome.is_retryable(), "{outcome:?}");
    assert!(received.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_grpc_insecure_skips_verification_but_keeps_tls() {
    let (collector, received) = start_tls_collector().await;
    let tls = TlsSettings {
        insecure: true,
        ..Default::default()
    };
    let dispatcher = Dispatcher::new(config(&collector.endpoint).with_tls(tls)).unwrap();

    assert!(dispatcher.dispatch(&common::stored_logs(1)).await.is_success());
    assert_eq!(received.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_grpc_tls_with_encrypted_client_key_is_success() {
    let (collector, received) = start_tls_collector().await;
    let tls = TlsSettings {
        cert_path: Some(fixture("server.pem")),
        private_key_path: Some(fixture("server-encrypted.key")),
        private_key_passphrase: Some("correct-passphrase".to_string()),
        ca_path: Some(fixture("ca.pem")),
        ..Default::default()
    };
    let dispatcher = Dispatcher::new(config(&collector.endpoint).with_tls(tls)).unwrap();

    assert!(dispatcher.dispatch(&common::stored_logs(1)).await.is_success());
    assert_eq!(received.lock().unwrap().len(), 1);
}
