//! Protocol error types.

use thiserror::Error;

/// Errors that can occur while validating inbound messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("unknown topic: {0}")]
    UnknownTopic(String),

    #[error("malformed payload on {topic}: {source}")]
    MalformedPayload {
        topic: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("username exceeds {0} characters")]
    UsernameTooLong(usize),
}
