use crate::load_state::LoadStatus;

/// Core protocol errors.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid load state transition from {from} on {event}")]
    InvalidStateTransition { from: LoadStatus, event: String },

    #[error("invalid DID format: {0}")]
    InvalidDid(String),

    #[error("invalid trust-exchange URI: {0}")]
    InvalidUri(String),

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
