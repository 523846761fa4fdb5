use std::time::Duration;

use thiserror::Error;

/// Top-level error type for building and configuring a Parley session.
///
/// Network failures never surface as `ParleyError`; they travel as
/// [`RawFailure`] values and end up classified.
#[derive(Debug, Error)]
pub enum ParleyError {
    #[error("invalid backend endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("HTTP client setup failed: {0}")]
    ClientSetup(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Unclassified outcome of a failed transport call.
///
/// Produced only by a [`crate::Transport`] implementation and consumed by
/// [`crate::classify`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RawFailure {
    /// The deadline elapsed before the backend answered.
    #[error("request exceeded deadline of {}ms", deadline.as_millis())]
    Timeout { deadline: Duration },

    /// The request never produced an HTTP response (DNS, refused, reset).
    #[error("transport error: {raw}")]
    Connectivity { raw: String },

    /// Non-2xx status. `message` is the server-supplied explanation, if any.
    #[error("server returned HTTP {status_code}")]
    ServerMessage {
        status_code: u16,
        message: Option<String>,
        raw: String,
    },

    /// 2xx status but the body is unusable.
    #[error("malformed response: {raw}")]
    MalformedResponse { raw: String },

    /// The caller's cancellation handle fired. Not an error for the user.
    #[error("request cancelled")]
    Cancelled,

    #[error("{0}")]
    Unrecognized(String),
}

impl RawFailure {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RawFailure::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_display_reports_deadline() {
        let failure = RawFailure::Timeout {
            deadline: Duration::from_millis(1500),
        };
        assert_eq!(failure.to_string(), "request exceeded deadline of 1500ms");
    }

    #[test]
    fn only_cancelled_reports_cancelled() {
        assert!(RawFailure::Cancelled.is_cancelled());
        assert!(!RawFailure::Unrecognized("x".into()).is_cancelled());
    }
}
