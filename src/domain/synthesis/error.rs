use std::time::Duration;

/// Failure classes of one synthesis call.
///
/// The retry policy treats timeouts, rate limits, 5xx responses and
/// connection errors as transient; everything else is permanent.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SynthesisError {
    #[error("synthesis request timed out after {0:?}")]
    Timeout(Duration),

    #[error("rate limited by synthesis endpoint")]
    RateLimited,

    #[error("synthesis endpoint returned status {0}")]
    Upstream(u16),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("invalid synthesis input: {0}")]
    InvalidInput(String),

    #[error("synthesis authentication failed: {0}")]
    Unauthorized(String),

    #[error("malformed synthesis response: {0}")]
    MalformedResponse(String),

    #[error("circuit open, retry in {}s", .0.as_secs())]
    CircuitOpen(Duration),
}

impl SynthesisError {
    pub fn is_retryable(&self) -> bool {
        match self {
            SynthesisError::Timeout(_)
            | SynthesisError::RateLimited
            | SynthesisError::Connection(_) => true,
            SynthesisError::Upstream(status) => (500..=599).contains(status),
            SynthesisError::InvalidInput(_)
            | SynthesisError::Unauthorized(_)
            | SynthesisError::MalformedResponse(_)
            | SynthesisError::CircuitOpen(_) => false,
        }
    }
}
