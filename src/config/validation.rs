use super::{ConfigError, Settings};

impl Settings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.receiver.is_none() && self.forwarder.is_none() {
            return Err(ConfigError::InvalidConfig(
                "At least one of [receiver] or [forwarder] must be configured".to_string(),
            ));
        }

        if let Some(receiver) = &self.receiver {
            if receiver.tag.trim().is_empty() {
                return Err(ConfigError::InvalidConfig(
                    "Receiver tag must not be empty".to_string(),
                ));
            }
            if receiver.port == 0 {
                return Err(ConfigError::InvalidConfig(
                    "Receiver port must be greater than 0".to_string(),
                ));
            }
            if receiver.bind.trim().is_empty() {
                return Err(ConfigError::InvalidConfig(
                    "Receiver bind address must not be empty".to_string(),
                ));
            }
        }

        if let Some(forwarder) = &self.forwarder {
            // Parses the endpoint and proxy URLs.
            forwarder.transport()?;

            if let Some(grpc) = &forwarder.grpc
                && forwarder.http.is_none()
            {
                let uri: Result<axum::http::Uri, _> = grpc.endpoint.parse();
                if uri.is_err() || !grpc.endpoint.contains("://") {
                    return Err(ConfigError::InvalidUrl(format!(
                        "Invalid gRPC endpoint '{}'",
                        grpc.endpoint
                    )));
                }
            }

            if forwarder.workers == 0 {
                return Err(ConfigError::InvalidConfig(
                    "Forwarder workers must be greater than 0".to_string(),
                ));
            }
            if forwarder.queue_capacity == 0 {
                return Err(ConfigError::InvalidConfig(
                    "Forwarder queue capacity must be greater than 0".to_string(),
                ));
            }
            if forwarder.timeout_secs == 0 {
                return Err(ConfigError::InvalidConfig(
                    "Forwarder timeout must be greater than 0".to_string(),
                ));
            }
            if forwarder.retry.max_attempts == 0 {
                return Err(ConfigError::InvalidConfig(
                    "Retry max attempts must be greater than 0".to_string(),
                ));
            }
            if forwarder.retry.base_delay_ms > forwarder.retry.max_delay_ms {
                return Err(ConfigError::InvalidConfig(
                    "Retry base delay must not exceed max delay".to_string(),
                ));
            }
            if let Some(code) = forwarder
                .retryable_response_codes
                .iter()
                .find(|code| !(100..=599).contains(*code))
            {
                return Err(ConfigError::InvalidConfig(format!(
                    "Retryable response code {code} is not an HTTP status"
                )));
            }

            if let Some(tls) = &forwarder.tls
                && let (Some(min), Some(max)) = (tls.min_version, tls.max_version)
                && min > max
            {
                return Err(ConfigError::InvalidConfig(format!(
                    "TLS min_version {min:?} must not be newer than max_version {max:?}"
                )));
            }
        }

        Ok(())
    }
}
