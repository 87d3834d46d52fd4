#![allow(dead_code)]

use opentelemetry_proto::tonic::collector::{
    logs::v1::ExportLogsServiceRequest, metrics::v1::ExportMetricsServiceRequest,
    trace::v1::ExportTraceServiceRequest,
};
use opentelemetry_proto::tonic::common::v1::{AnyValue, KeyValue, any_value};
use opentelemetry_proto::tonic::logs::v1::{LogRecord, ResourceLogs, ScopeLogs};
use opentelemetry_proto::tonic::metrics::v1::{
    Exemplar, Gauge, Histogram, HistogramDataPoint, Metric, NumberDataPoint, ResourceMetrics,
    ScopeMetrics, Summary, SummaryDataPoint, exemplar, metric, number_data_point,
    summary_data_point::ValueAtQuantile,
};
use opentelemetry_proto::tonic::resource::v1::Resource;
use opentelemetry_proto::tonic::trace::v1::{ResourceSpans, ScopeSpans, Span, span};
use rask_otlp_gateway::domain::{CanonicalRecord, EmittedRecord};

pub fn string_attr(key: &str, value: &str) -> KeyValue {
    KeyValue {
        key: key.to_string(),
        value: Some(AnyValue {
            value: Some(any_value::Value::StringValue(value.to_string())),
        }),
    }
}

pub fn double_attr(key: &str, value: f64) -> KeyValue {
    KeyValue {
        key: key.to_string(),
        value: Some(AnyValue {
            value: Some(any_value::Value::DoubleValue(value)),
        }),
    }
}

fn resource(service: &str) -> Option<Resource> {
    Some(Resource {
        attributes: vec![string_attr("service.name", service)],
        ..Default::default()
    })
}

pub fn logs_request(n: usize) -> ExportLogsServiceRequest {
    let log_records = (0..n)
        .map(|i| LogRecord {
            time_unix_nano: 1_700_000_000_000_000_000 + i as u64,
            severity_number: 9,
            severity_text: "INFO".to_string(),
            body: Some(AnyValue {
                value: Some(any_value::Value::StringValue(format!("log line {i}"))),
            }),
            trace_id: vec![0xab; 16],
            span_id: vec![0xcd; 8],
            ..Default::default()
        })
        .collect();

    ExportLogsServiceRequest {
        resource_logs: vec![ResourceLogs {
            resource: resource("gateway-test"),
            scope_logs: vec![ScopeLogs {
                log_records,
                ..Default::default()
            }],
            ..Default::default()
        }],
    }
}

pub fn metrics_request(n: usize) -> ExportMetricsServiceRequest {
    let data_points = (0..n)
        .map(|i| NumberDataPoint {
            time_unix_nano: 1_700_000_000_000_000_000 + i as u64,
            value: Some(number_data_point::Value::AsInt(i as i64)),
            ..Default::default()
        })
        .collect();

    ExportMetricsServiceRequest {
        resource_metrics: vec![ResourceMetrics {
            resource: resource("gateway-test"),
            scope_metrics: vec![ScopeMetrics {
                metrics: vec![Metric {
                    name: "queue.depth".to_string(),
                    unit: "1".to_string(),
                    data: Some(metric::Data::Gauge(Gauge { data_points })),
                    ..Default::default()
                }],
                ..Default::default()
            }],
            ..Default::default()
        }],
    }
}

pub fn traces_request(n: usize) -> ExportTraceServiceRequest {
    let spans = (0..n)
        .map(|i| Span {
            trace_id: vec![0x01; 16],
            span_id: vec![i as u8 + 1; 8],
            name: format!("span-{i}"),
            kind: 2,
            start_time_unix_nano: 1_700_000_000_000_000_000,
            end_time_unix_nano: 1_700_000_000_001_000_000,
            ..Default::default()
        })
        .collect();

    ExportTraceServiceRequest {
        resource_spans: vec![ResourceSpans {
            resource: resource("gateway-test"),
            scope_spans: vec![ScopeSpans {
                spans,
                ..Default::default()
            }],
            ..Default::default()
        }],
    }
}

fn metric(name: &str, data: metric::Data) -> Metric {
    Metric {
        name: name.to_string(),
        data: Some(data),
        ..Default::default()
    }
}

/// One request per kind whose double fields hold NaN and the infinities.
pub fn non_finite_requests() -> Vec<CanonicalRecord> {
    let logs = ExportLogsServiceRequest {
        resource_logs: vec![ResourceLogs {
            scope_logs: vec![ScopeLogs {
                log_records: vec![LogRecord {
                    body: Some(AnyValue {
                        value: Some(any_value::Value::DoubleValue(f64::NAN)),
                    }),
                    attributes: vec![double_attr("ratio", f64::INFINITY)],
                    ..Default::default()
                }],
                ..Default::default()
            }],
            ..Default::default()
        }],
    };

    let metrics = ExportMetricsServiceRequest {
        resource_metrics: vec![ResourceMetrics {
            scope_metrics: vec![ScopeMetrics {
                metrics: vec![
                    metric(
                        "up",
                        metric::Data::Gauge(Gauge {
                            data_points: vec![NumberDataPoint {
                                value: Some(number_data_point::Value::AsDouble(f64::NAN)),
                                exemplars: vec![Exemplar {
                                    value: Some(exemplar::Value::AsDouble(f64::NEG_INFINITY)),
                                    ..Default::default()
                                }],
                                ..Default::default()
                            }],
                        }),
                    ),
                    metric(
                        "latency",
                        metric::Data::Histogram(Histogram {
                            data_points: vec![HistogramDataPoint {
                                count: 2,
                                sum: Some(f64::INFINITY),
                                min: Some(f64::NAN),
                                max: Some(f64::INFINITY),
                                bucket_counts: vec![1, 1],
                                explicit_bounds: vec![f64::INFINITY],
                                ..Default::default()
                            }],
                            aggregation_temporality: 2,
                        }),
                    ),
                    metric(
                        "rtt",
                        metric::Data::Summary(Summary {
                            data_points: vec![SummaryDataPoint {
                                count: 1,
                                sum: f64::NEG_INFINITY,
                                quantile_values: vec![ValueAtQuantile {
                                    quantile: 0.99,
                                    value: f64::NAN,
                                }],
                                ..Default::default()
                            }],
                        }),
                    ),
                ],
                ..Default::default()
            }],
            ..Default::default()
        }],
    };

    let traces = ExportTraceServiceRequest {
        resource_spans: vec![ResourceSpans {
            scope_spans: vec![ScopeSpans {
                spans: vec![Span {
                    trace_id: vec![0x01; 16],
                    span_id: vec![0x02; 8],
                    name: "score".to_string(),
                    attributes: vec![double_attr("score", f64::NEG_INFINITY)],
                    events: vec![span::Event {
                        name: "sample".to_string(),
                        attributes: vec![double_attr("value", f64::NAN)],
                        ..Default::default()
                    }],
                    ..Default::default()
                }],
                ..Default::default()
            }],
            ..Default::default()
        }],
    };

    vec![
        CanonicalRecord::Logs(logs),
        CanonicalRecord::Metrics(metrics),
        CanonicalRecord::Traces(traces),
    ]
}

pub fn stored_logs(n: usize) -> EmittedRecord {
    EmittedRecord::from_canonical(&CanonicalRecord::Logs(logs_request(n))).unwrap()
}

pub fn stored_metrics(n: usize) -> EmittedRecord {
    EmittedRecord::from_canonical(&CanonicalRecord::Metrics(metrics_request(n))).unwrap()
}

pub fn stored_traces(n: usize) -> EmittedRecord {
    EmittedRecord::from_canonical(&CanonicalRecord::Traces(traces_request(n))).unwrap()
}
