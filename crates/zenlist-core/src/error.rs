use thiserror::Error;

/// Classified failure of a sync-layer call.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Non-success response status with no operation errors in the body.
    #[error("request failed: {status}")]
    Transport { status: u16 },

    /// The response carried application errors; the first one wins.
    #[error("{message}")]
    Operation {
        message: String,
        code: Option<String>,
    },

    /// A required selection is absent. Actions are skipped, not attempted.
    #[error("{action} requires {requirement}")]
    ValidationGap {
        action: &'static str,
        requirement: &'static str,
    },

    #[error("another action is in flight: {running}")]
    Busy { running: String },

    #[error("invalid {field}: {message}")]
    InvalidInput {
        field: &'static str,
        message: String,
    },

    #[error("{operation} response is missing `{field}`")]
    MissingField {
        operation: &'static str,
        field: &'static str,
    },

    #[error("failed to decode {operation} response: {source}")]
    Decode {
        operation: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode request: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl SyncError {
    pub fn operation(message: impl Into<String>) -> Self {
        SyncError::Operation {
            message: message.into(),
            code: None,
        }
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, SyncError::ValidationGap { .. })
    }
}
