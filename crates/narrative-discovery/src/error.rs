/// Errors from the discovery engine handle.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("discovery engine stopped")]
    Closed,

    #[error("timed out waiting for discovery")]
    Timeout,

    #[error("invalid DID: {0}")]
    InvalidDid(String),

    #[error("core error: {0}")]
    Core(#[from] narrative_core::CoreError),
}
