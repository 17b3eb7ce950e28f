//! Resolver status events.
//!
//! These are emitted by the [`crate::DocumentResolver`] to an optional
//! observer so that diagnostics tooling can mirror tracked addresses
//! without the resolver depending on it.

use narrative_core::LoadStatus;
use serde::Serialize;

/// One status transition of a tracked address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusChange {
    /// The document address.
    pub address: String,
    /// Status before the transition.
    pub from: LoadStatus,
    /// Status after the transition.
    pub to: LoadStatus,
    /// Zero-based attempt index the transition belongs to.
    pub attempt: u32,
    /// Failure reason of the attempt, when it failed.
    pub error: Option<String>,
}

/// Receives resolver status transitions.
pub trait ResolverObserver: Send + Sync {
    fn on_status(&self, _change: &StatusChange) {}
}
