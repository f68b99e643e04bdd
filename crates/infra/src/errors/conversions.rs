//! Conversions from external infrastructure errors into domain errors.

use reqwest::Error as HttpError;
use serde_json::Error as JsonError;
use std::io::Error as IoError;
use vitalsync_domain::VitalSyncError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub VitalSyncError);

impl From<InfraError> for VitalSyncError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<VitalSyncError> for InfraError {
    fn from(value: VitalSyncError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoVitalSyncError {
    fn into_vitalsync(self) -> VitalSyncError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → VitalSyncError */
/* -------------------------------------------------------------------------- */

impl IntoVitalSyncError for HttpError {
    fn into_vitalsync(self) -> VitalSyncError {
        if self.is_builder() {
            return VitalSyncError::Config(format!("invalid HTTP request: {self}"));
        }

        if self.is_timeout() {
            return VitalSyncError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return VitalSyncError::Network(format!("HTTP connection failure: {self}"));
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));

            return match code {
                401 => VitalSyncError::AuthExpired(message),
                429 => VitalSyncError::RateLimited(message),
                400..=499 => VitalSyncError::Client(message),
                _ => VitalSyncError::Server(message),
            };
        }

        VitalSyncError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_vitalsync())
    }
}

/* -------------------------------------------------------------------------- */
/* std::io::Error → VitalSyncError */
/* -------------------------------------------------------------------------- */

impl IntoVitalSyncError for IoError {
    fn into_vitalsync(self) -> VitalSyncError {
        use std::io::ErrorKind;

        match self.kind() {
            ErrorKind::NotFound => VitalSyncError::Storage(format!("file not found: {self}")),
            ErrorKind::PermissionDenied => {
                VitalSyncError::Storage(format!("permission denied: {self}"))
            }
            _ => VitalSyncError::Storage(self.to_string()),
        }
    }
}

impl From<IoError> for InfraError {
    fn from(value: IoError) -> Self {
        InfraError(value.into_vitalsync())
    }
}

/* -------------------------------------------------------------------------- */
/* serde_json::Error → VitalSyncError */
/* -------------------------------------------------------------------------- */

impl IntoVitalSyncError for JsonError {
    fn into_vitalsync(self) -> VitalSyncError {
        VitalSyncError::Payload(format!(
            "invalid JSON at line {} column {}: {self}",
            self.line(),
            self.column()
        ))
    }
}

impl From<JsonError> for InfraError {
    fn from(value: JsonError) -> Self {
        InfraError(value.into_vitalsync())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use reqwest::{Client, StatusCode};
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[test]
    fn missing_file_maps_to_storage_error() {
        let err = IoError::new(std::io::ErrorKind::NotFound, "tokens.json");
        let mapped: VitalSyncError = InfraError::from(err).into();
        match mapped {
            VitalSyncError::Storage(msg) => assert!(msg.contains("not found")),
            other => panic!("expected storage error, got {:?}", other),
        }
    }

    #[test]
    fn json_error_reports_position() {
        let err = serde_json::from_str::<serde_json::Value>("{\"a\":").unwrap_err();
        let mapped: VitalSyncError = InfraError::from(err).into();
        match mapped {
            VitalSyncError::Payload(msg) => assert!(msg.contains("line 1")),
            other => panic!("expected payload error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn http_status_429_maps_to_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(StatusCode::TOO_MANY_REQUESTS))
            .mount(&server)
            .await;

        let client = Client::builder().no_proxy().build().unwrap();
        let error = client.get(server.uri()).send().await.unwrap().error_for_status().unwrap_err();

        let mapped: VitalSyncError = InfraError::from(error).into();
        match mapped {
            VitalSyncError::RateLimited(msg) => assert!(msg.contains("429")),
            other => panic!("expected rate limited, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn refused_connection_maps_to_network_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = Client::builder().no_proxy().build().unwrap();
        let error = client.get(format!("http://{addr}")).send().await.unwrap_err();

        let mapped: VitalSyncError = InfraError::from(error).into();
        assert!(matches!(mapped, VitalSyncError::Network(_)));
    }
}
