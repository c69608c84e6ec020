//! Error types for the escape room wire format.

use thiserror::Error;

/// Errors that can occur while encoding or decoding server traffic.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// JSON serialization failed
    #[error("serialization failed: {0}")]
    Serialization(#[source] serde_json::Error),

    /// JSON deserialization failed
    #[error("deserialization failed: {0}")]
    Deserialization(#[source] serde_json::Error),

    /// A reply decoded but violates the protocol
    #[error("invalid data: {0}")]
    InvalidData(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ProtocolError::InvalidData("puzzle without question".into());
        assert_eq!(err.to_string(), "invalid data: puzzle without question");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ProtocolError>();
    }
}
