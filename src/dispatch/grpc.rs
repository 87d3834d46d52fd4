//! gRPC OTLP sender.
//!
//! Cheap to clone; the underlying channel handles connection pooling and
//! multiplexing, so one instance is shared by every flush worker.

use std::time::Duration;

use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::connect::HttpConnector;
use opentelemetry_proto::tonic::collector::{
    logs::v1::logs_service_client::LogsServiceClient,
    metrics::v1::metrics_service_client::MetricsServiceClient,
    trace::v1::trace_service_client::TraceServiceClient,
};
use rustls::ClientConfig;
use tonic::codec::CompressionEncoding;
use tonic::transport::{Channel, Endpoint};
use tonic::{Code, Status};
use tracing::{debug, warn};

use super::config::TlsSettings;
use super::tls::TlsMaterial;
use super::{Delivery, ResponseCode, TransportError};
use crate::codec::response::PartialSuccess;
use crate::domain::CanonicalRecord;

#[derive(Debug, Clone)]
pub struct GrpcTransport {
    endpoint: String,
    logs_client: LogsServiceClient<Channel>,
    metrics_client: MetricsServiceClient<Channel>,
    trace_client: TraceServiceClient<Channel>,
}

impl GrpcTransport {
    /// Builds a lazily connecting channel. Must be called inside a Tokio
    /// runtime.
    pub fn new(
        endpoint: &str,
        tls: Option<&TlsSettings>,
        timeout: Duration,
        gzip: bool,
    ) -> Result<Self, TransportError> {
        let builder = Endpoint::from_shared(endpoint.to_string())
            .map_err(|e| TransportError::InvalidEndpoint(format!("{endpoint}: {e}")))?
            .timeout(timeout)
            .connect_timeout(timeout);

        let https = endpoint.starts_with("https://");
        let channel = match tls {
            Some(tls) => {
                let config = TlsMaterial::load(tls)?.client_config(tls)?;
                if tls.insecure && https {
                    warn!(endpoint, "insecure is set, server certificates are not verified");
                }
                builder.connect_with_connector_lazy(tls_connector(config, timeout))
            }
            None if https => {
                let config = TlsMaterial::default().client_config(&TlsSettings::default())?;
                builder.connect_with_connector_lazy(tls_connector(config, timeout))
            }
            None => builder.connect_lazy(),
        };
        debug!(endpoint, gzip, tls = tls.is_some() || https, "Configured OTLP/gRPC channel");

        let mut logs_client = LogsServiceClient::new(channel.clone());
        let mut metrics_client = MetricsServiceClient::new(channel.clone());
        let mut trace_client = TraceServiceClient::new(channel);
        if gzip {
            logs_client = logs_client.send_compressed(CompressionEncoding::Gzip);
            metrics_client = metrics_client.send_compressed(CompressionEncoding::Gzip);
            trace_client = trace_client.send_compressed(CompressionEncoding::Gzip);
        }

        Ok(Self {
            endpoint: endpoint.to_string(),
            logs_client,
            metrics_client,
            trace_client,
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Unary `Export` on the collector service matching the record's kind.
    pub async fn send(&self, record: CanonicalRecord) -> Delivery {
        let result = match record {
            CanonicalRecord::Logs(request) => {
                let mut client = self.logs_client.clone();
                client.export(request).await.map(|r| {
                    r.into_inner().partial_success.map(|p| PartialSuccess {
                        rejected: p.rejected_log_records,
                        error_message: p.error_message,
                    })
                })
            }
            CanonicalRecord::Metrics(request) => {
                let mut client = self.metrics_client.clone();
                client.export(request).await.map(|r| {
                    r.into_inner().partial_success.map(|p| PartialSuccess {
                        rejected: p.rejected_data_points,
                        error_message: p.error_message,
                    })
                })
            }
            CanonicalRecord::Traces(request) => {
                let mut client = self.trace_client.clone();
                client.export(request).await.map(|r| {
                    r.into_inner().partial_success.map(|p| PartialSuccess {
                        rejected: p.rejected_spans,
                        error_message: p.error_message,
                    })
                })
            }
        };

        match result {
            Ok(partial) => Delivery::Acknowledged { partial },
            Err(status) => status_to_delivery(status),
        }
    }
}

/// h2 over rustls for `https://` endpoints. `http://` endpoints stay
/// plaintext even with TLS settings present.
fn tls_connector(config: ClientConfig, timeout: Duration) -> HttpsConnector<HttpConnector> {
    let mut http = HttpConnector::new();
    http.enforce_http(false);
    http.set_nodelay(true);
    http.set_connect_timeout(Some(timeout));
    HttpsConnectorBuilder::new()
        .with_tls_config(config)
        .https_or_http()
        .enable_http2()
        .wrap_connector(http)
}

/// Unavailable and DeadlineExceeded mean the peer was never reached or never
/// answered; every other status is an answer from the receiver.
fn status_to_delivery(status: Status) -> Delivery {
    match status.code() {
        Code::Unavailable | Code::DeadlineExceeded => Delivery::Unreachable {
            message: status.to_string(),
        },
        code => Delivery::Rejected {
            code: ResponseCode::Grpc(code),
            message: status.message().to_string(),
        },
    }
}
