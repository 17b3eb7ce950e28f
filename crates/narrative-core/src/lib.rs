//! Narrative Core — fundamental types, errors, and configuration for the
//! Narrative web-of-trust layer.

pub mod attestation;
pub mod config;
pub mod document;
pub mod error;
pub mod exchange_uri;
pub mod known_profile;
pub mod load_state;
pub mod profile;
pub mod types;
pub mod workspace;

pub use attestation::{TrustAttestation, TrustLevel, VerificationMethod};
pub use config::{ResolverConfig, TrustPolicy};
pub use document::{PersonalDocument, PERSONAL_DOCUMENT_VERSION};
pub use error::CoreError;
pub use exchange_uri::TrustExchangeUri;
pub use known_profile::{DiscoverySource, KnownProfile, SignatureStatus, TrustFlags};
pub use load_state::{LoadEvent, LoadStateMachine, LoadStatus};
pub use profile::Profile;
pub use types::{new_attestation_id, new_document_address, Did, Identity};
pub use workspace::{WorkspaceDocument, WorkspaceIdentity};
