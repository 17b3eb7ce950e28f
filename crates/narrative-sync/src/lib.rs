//! Narrative sync layer.
//!
//! The replication substrate is a black box reached through the [`Repo`] /
//! [`DocHandle`] contract. On top of it this crate provides:
//!
//! - **DocumentResolver**: per-address load status machine, per-attempt
//!   timeout, exponential backoff, readiness predicates
//! - **Subscriptions**: cancelable, duplicate-suppressing mutation streams
//! - **MemoryRepo**: an in-process substrate with fault injection

pub mod error;
pub mod events;
pub mod memory;
pub mod repo;
pub mod resolver;
pub mod subscription;

pub use error::SyncError;
pub use events::{ResolverObserver, StatusChange};
pub use memory::{Fault, MemoryRepo};
pub use repo::{read_doc, update_doc, DocHandle, Repo};
pub use resolver::{AddressStatus, DocumentResolver};
pub use subscription::{on_mutation, Subscription};
