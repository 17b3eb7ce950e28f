//! Narrative Trust Layer
//!
//! Trust attestations between self-sovereign identities:
//! - Attestation store (one attestation per counterparty per direction)
//! - Trust protocol (sign, write locally, best-effort remote append,
//!   local-only revocation, mutual trust detection)
//! - Notification filter over incoming attestations

pub mod error;
pub mod notifications;
pub mod protocol;
pub mod store;

pub use error::TrustError;
pub use notifications::{MemorySeenStore, NotificationFilter, SeenStore};
pub use protocol::{MutualTrust, MutualTrustDetector, PropagationOutcome, TrustOutcome, TrustProtocol};
pub use store::AttestationStore;
