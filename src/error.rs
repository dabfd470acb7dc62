use std::error::Error;
use std::fmt;

use warp::reject::Reject;

/// Error type for request-level failures, surfaced before any stream is opened
#[derive(Debug, Clone)]
pub struct RelayError {
    pub message: String,
    pub status_code: u16,
    kind: RelayErrorKind,
}

#[derive(Debug, Clone)]
enum RelayErrorKind {
    BadRequest,
    Configuration,
    InternalServerError,
}

impl RelayError {
    pub fn bad_request(message: &str) -> Self {
        Self {
            message: message.to_string(),
            status_code: 400,
            kind: RelayErrorKind::BadRequest,
        }
    }

    pub fn configuration(message: &str) -> Self {
        Self {
            message: message.to_string(),
            status_code: 500,
            kind: RelayErrorKind::Configuration,
        }
    }

    pub fn internal_server_error(message: &str) -> Self {
        Self {
            message: message.to_string(),
            status_code: 500,
            kind: RelayErrorKind::InternalServerError,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self.kind, RelayErrorKind::BadRequest)
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self.kind, RelayErrorKind::Configuration)
    }
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RelayError {}: {}", self.status_code, self.message)
    }
}

impl Error for RelayError {}

impl Reject for RelayError {}

/// Why the upstream provider stream could not be relayed.
///
/// Every variant reaches the client as exactly one in-stream error frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamFailure {
    /// The provider answered with a non-success status.
    Http { status: u16, body: String },
    /// The provider answered without a body to stream.
    MissingBody,
    /// The connection failed while opening or reading the stream.
    Transport(String),
}

impl fmt::Display for UpstreamFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpstreamFailure::Http { status, body } => {
                write!(f, "MiniMax API error: {} - {}", status, body)
            }
            UpstreamFailure::MissingBody => {
                write!(f, "{}", crate::constants::ERROR_NO_RESPONSE_BODY)
            }
            UpstreamFailure::Transport(message) => write!(f, "Stream error: {}", message),
        }
    }
}

impl Error for UpstreamFailure {}

/// The client stopped reading; nothing more can be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownstreamClosed;

impl fmt::Display for DownstreamClosed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("downstream client disconnected")
    }
}

impl Error for DownstreamClosed {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_failure_mentions_status_and_body() {
        let failure = UpstreamFailure::Http {
            status: 500,
            body: "boom".to_string(),
        };
        assert_eq!(failure.to_string(), "MiniMax API error: 500 - boom");
    }

    #[test]
    fn transport_failure_is_prefixed() {
        let failure = UpstreamFailure::Transport("connection reset".to_string());
        assert_eq!(failure.to_string(), "Stream error: connection reset");
    }

    #[test]
    fn bad_request_maps_to_400() {
        let err = RelayError::bad_request("Message is required");
        assert_eq!(err.status_code, 400);
        assert!(err.is_validation());
        assert!(!err.is_configuration());
    }
}
