//! Error types for the Forge provider.

use thiserror::Error;

/// Errors that can occur while serving provider operations.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The remote service reports that the entity does not exist.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Configuration failed schema validation before any remote call.
    #[error("Validation error: {0}")]
    Validation(String),

    /// No API token was found in configuration or environment.
    #[error("Missing API token: {0}")]
    MissingCredential(String),

    /// The remote API or the transport to it failed.
    #[error("{}", remote_display(.status, .message))]
    Remote {
        /// HTTP status returned by the API, if a response was received.
        status: Option<u16>,
        /// Body or transport message describing the failure.
        message: String,
    },

    /// An operation needing the API client ran before `configure`.
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    /// A configuration error occurred.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested resource or data source type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A gRPC transport error occurred.
    #[error("Transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    /// Operation not implemented.
    #[error("Unimplemented: {0}")]
    Unimplemented(String),

    /// Invalid request from the host.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

fn remote_display(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(code) => format!("Remote API error (HTTP {}): {}", code, message),
        None => format!("Remote API error: {}", message),
    }
}

impl ProviderError {
    /// Build a [`ProviderError::Remote`] from a status and message.
    pub fn remote(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Remote {
            status,
            message: message.into(),
        }
    }

    /// Whether this error signals that the remote entity no longer exists.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Get the error message as a string.
    pub fn message(&self) -> &str {
        match self {
            Self::NotFound(msg) => msg,
            Self::Validation(msg) => msg,
            Self::MissingCredential(msg) => msg,
            Self::Remote { message, .. } => message,
            Self::NotConfigured(msg) => msg,
            Self::Configuration(msg) => msg,
            Self::UnknownResource(msg) => msg,
            Self::Serialization(_err) => "serialization error (see Debug output)",
            Self::Transport(_err) => "transport error (see Debug output)",
            Self::Unimplemented(msg) => msg,
            Self::InvalidRequest(msg) => msg,
        }
    }

    /// Short summary used as the diagnostic headline for this error.
    pub fn summary(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "Resource Not Found",
            Self::Validation(_) => "Invalid Configuration",
            Self::MissingCredential(_) => "Missing API Token Configuration",
            Self::Remote { .. } => "Client Error",
            Self::NotConfigured(_) => "Provider Not Configured",
            Self::Configuration(_) => "Provider Configuration Error",
            Self::UnknownResource(_) => "Unknown Resource Type",
            Self::Serialization(_) => "Invalid State Encoding",
            Self::Transport(_) => "Transport Error",
            Self::Unimplemented(_) => "Operation Not Supported",
            Self::InvalidRequest(_) => "Invalid Request",
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        let status = err.status().map(|s| s.as_u16());
        if err.is_timeout() {
            return Self::remote(status, format!("request timed out: {}", err));
        }
        Self::remote(status, err.to_string())
    }
}

impl From<ProviderError> for tonic::Status {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotFound(msg) => tonic::Status::not_found(msg),
            ProviderError::Validation(msg) => tonic::Status::invalid_argument(msg),
            ProviderError::MissingCredential(msg) => tonic::Status::failed_precondition(msg),
            ProviderError::Remote { status, message } => match status {
                Some(code) if code < 500 => {
                    tonic::Status::unknown(remote_display(&Some(code), &message))
                },
                _ => tonic::Status::unavailable(remote_display(&status, &message)),
            },
            ProviderError::NotConfigured(msg) => tonic::Status::failed_precondition(msg),
            ProviderError::Configuration(msg) => tonic::Status::failed_precondition(msg),
            ProviderError::UnknownResource(msg) => tonic::Status::not_found(msg),
            ProviderError::Serialization(err) => {
                tonic::Status::invalid_argument(format!("Serialization error: {}", err))
            },
            ProviderError::Transport(err) => {
                tonic::Status::unavailable(format!("Transport error: {}", err))
            },
            ProviderError::Unimplemented(msg) => tonic::Status::unimplemented(msg),
            ProviderError::InvalidRequest(msg) => tonic::Status::invalid_argument(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProviderError::NotFound("site 42".to_string());
        assert_eq!(format!("{}", err), "Resource not found: site 42");

        let err = ProviderError::Validation("platform must be one of ocean2".to_string());
        assert_eq!(
            format!("{}", err),
            "Validation error: platform must be one of ocean2"
        );

        let err = ProviderError::remote(Some(500), "boom");
        assert_eq!(format!("{}", err), "Remote API error (HTTP 500): boom");

        let err = ProviderError::remote(None, "connection refused");
        assert_eq!(format!("{}", err), "Remote API error: connection refused");
    }

    #[test]
    fn test_error_to_status() {
        let status: tonic::Status = ProviderError::NotFound("test".to_string()).into();
        assert_eq!(status.code(), tonic::Code::NotFound);

        let status: tonic::Status = ProviderError::Validation("test".to_string()).into();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);

        let status: tonic::Status = ProviderError::MissingCredential("test".to_string()).into();
        assert_eq!(status.code(), tonic::Code::FailedPrecondition);

        let status: tonic::Status = ProviderError::NotConfigured("test".to_string()).into();
        assert_eq!(status.code(), tonic::Code::FailedPrecondition);

        let status: tonic::Status = ProviderError::Unimplemented("test".to_string()).into();
        assert_eq!(status.code(), tonic::Code::Unimplemented);
    }

    #[test]
    fn test_remote_status_mapping() {
        let status: tonic::Status = ProviderError::remote(Some(503), "down").into();
        assert_eq!(status.code(), tonic::Code::Unavailable);

        let status: tonic::Status = ProviderError::remote(None, "reset").into();
        assert_eq!(status.code(), tonic::Code::Unavailable);

        let status: tonic::Status = ProviderError::remote(Some(422), "bad field").into();
        assert_eq!(status.code(), tonic::Code::Unknown);
    }

    #[test]
    fn test_not_found_is_distinct_from_remote() {
        assert!(ProviderError::NotFound("gone".to_string()).is_not_found());
        assert!(!ProviderError::remote(Some(404), "gone").is_not_found());
        assert!(!ProviderError::Validation("bad".to_string()).is_not_found());
    }

    #[test]
    fn test_message_method() {
        let err = ProviderError::NotFound("server-123".to_string());
        assert_eq!(err.message(), "server-123");

        let err = ProviderError::remote(Some(401), "unauthenticated");
        assert_eq!(err.message(), "unauthenticated");
        assert_eq!(err.summary(), "Client Error");

        let err = ProviderError::MissingCredential("set FORGE_API_TOKEN".to_string());
        assert_eq!(err.summary(), "Missing API Token Configuration");
    }
}
