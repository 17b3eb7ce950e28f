//! Narrative profile discovery.
//!
//! Keeps every profile reachable from the local identity live:
//! - the local document itself (`self`)
//! - first-degree trust, both directions
//! - second-degree trust, crawled once per DID
//! - externally registered DID/address pairs
//! - workspace identity tables as an unsigned fallback
//!
//! Conflicts between sources are settled by [`merge_profile`].

pub mod engine;
pub mod error;
pub mod observer;
pub mod priority;

pub use engine::{DiscoveredProfile, DiscoveryEngine, DiscoverySnapshot, TrackState, TrackedAddress};
pub use error::DiscoveryError;
pub use observer::DiscoveryObserver;
pub use priority::{merge_profile, MergeOutcome};
