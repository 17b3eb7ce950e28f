/// Errors from the replication substrate and the resolver wrapped around it.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("document not found: {0}")]
    NotFound(String),

    #[error("document {address} unavailable: {reason}")]
    Unavailable { address: String, reason: String },

    #[error("document {0} has no content yet")]
    NotReady(String),

    #[error("document {0} handle closed")]
    Closed(String),

    #[error("document {address} timed out after {attempts} attempts")]
    Timeout { address: String, attempts: u32 },

    #[error("document {address} failed after {attempts} attempts: {last_error}")]
    Exhausted {
        address: String,
        attempts: u32,
        last_error: String,
    },

    #[error("status error: {0}")]
    State(#[from] narrative_core::CoreError),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
