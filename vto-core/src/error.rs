//! Error types for vto-core.

use thiserror::Error;

/// Result type alias using vto-core Error
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for relay operations
#[derive(Error, Debug)]
pub enum Error {
    // Inbound errors
    #[error("Invalid inbound event: {0}")]
    InvalidEvent(String),

    // Synthesis errors
    #[error("Synthesis failed: {0}")]
    SynthesisFailed(String),

    #[error("Synthesis returned an empty result")]
    EmptySynthesisResult,

    // Messaging errors
    #[error("Failed to send message to {recipient}: {reason}")]
    NotifyFailed { recipient: String, reason: String },

    // Queue errors
    #[error("Queue '{0}' is full")]
    QueueFull(String),

    #[error("Queue '{0}' is closed")]
    QueueClosed(String),

    // Transport errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // Generic errors
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error for a malformed inbound event
    pub fn invalid_event(message: impl Into<String>) -> Self {
        Self::InvalidEvent(message.into())
    }

    /// Create an error for a failed synthesis call
    pub fn synthesis_failed(message: impl Into<String>) -> Self {
        Self::SynthesisFailed(message.into())
    }

    /// Create an error for an undelivered outbound message
    pub fn notify_failed(recipient: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::NotifyFailed {
            recipient: recipient.into(),
            reason: reason.into(),
        }
    }

    /// Check if this error came from the synthesis service
    pub fn is_synthesis(&self) -> bool {
        matches!(self, Self::SynthesisFailed(_) | Self::EmptySynthesisResult)
    }

    /// Check if this error means a job could not be queued
    pub fn is_queue(&self) -> bool {
        matches!(self, Self::QueueFull(_) | Self::QueueClosed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = Error::invalid_event("missing From");
        assert!(err.to_string().contains("missing From"));

        let err = Error::notify_failed("whatsapp:+15550001", "401 Unauthorized");
        assert!(err.to_string().contains("whatsapp:+15550001"));
        assert!(err.to_string().contains("401"));
    }

    #[test]
    fn test_error_classification() {
        assert!(Error::synthesis_failed("503").is_synthesis());
        assert!(Error::EmptySynthesisResult.is_synthesis());
        assert!(!Error::Other("x".into()).is_synthesis());

        assert!(Error::QueueFull("tryon".into()).is_queue());
        assert!(Error::QueueClosed("tryon".into()).is_queue());
        assert!(!Error::invalid_event("x").is_queue());
    }
}
