//! Relay failure taxonomy.
//!
//! Every failure except [`RelayError::Decode`] ends a relay stream. Decode
//! failures are recovered inside the decoders, logged, and counted under
//! `relay_errors_total{kind="decode"}`; they never reach the caller.

use axum::http::StatusCode;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    /// The provider could not be initialized (e.g. missing API key).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The provider could not be reached, or the connection broke mid-stream.
    #[error("Error connecting to {provider}: {detail}")]
    UpstreamConnection { provider: String, detail: String },

    /// The provider answered, but with a failure.
    #[error("{provider} returned an error: {detail}")]
    UpstreamProtocol { provider: String, detail: String },

    /// A line or event could not be parsed into the expected shape.
    #[error("Could not decode stream unit: {0}")]
    Decode(String),

    /// Anything else that went wrong while producing the stream.
    #[error("An unexpected error occurred: {0}")]
    Unclassified(String),
}

impl RelayError {
    /// Short label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            RelayError::Configuration(_) => "configuration",
            RelayError::UpstreamConnection { .. } => "upstream_connection",
            RelayError::UpstreamProtocol { .. } => "upstream_protocol",
            RelayError::Decode(_) => "decode",
            RelayError::Unclassified(_) => "unclassified",
        }
    }

    /// Status used when errors are reported out-of-band.
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
            RelayError::UpstreamConnection { .. } | RelayError::UpstreamProtocol { .. } => {
                StatusCode::BAD_GATEWAY
            }
            RelayError::Decode(_) | RelayError::Unclassified(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub(crate) fn connection(provider: &str, err: impl std::fmt::Display) -> Self {
        RelayError::UpstreamConnection {
            provider: provider.to_string(),
            detail: err.to_string(),
        }
    }

    pub(crate) fn protocol(provider: &str, detail: impl Into<String>) -> Self {
        RelayError::UpstreamProtocol {
            provider: provider.to_string(),
            detail: detail.into(),
        }
    }
}
