//! Resilient document resolution.
//!
//! Every address goes through the load status machine:
//! `pending -> loading -> {ready | error | timeout}`. Each attempt is a
//! substrate `find` followed by waiting for the readiness predicate, both
//! bounded by the per-attempt timeout. Failed attempts back off
//! exponentially until the attempt budget is spent.

use dashmap::DashMap;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use narrative_core::{LoadEvent, LoadStateMachine, LoadStatus, PersonalDocument, ResolverConfig};

use crate::error::SyncError;
use crate::events::{ResolverObserver, StatusChange};
use crate::repo::{DocHandle, Repo};

/// Diagnostic view of one tracked address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddressStatus {
    pub status: LoadStatus,
    /// Attempts issued by the current (or last) resolution.
    pub attempts: u32,
    pub last_error: Option<String>,
}

impl AddressStatus {
    fn pending() -> Self {
        Self {
            status: LoadStatus::Pending,
            attempts: 0,
            last_error: None,
        }
    }
}

/// How an attempt ended when it did not produce a handle.
enum AttemptFailure {
    TimedOut,
    Failed(SyncError),
}

/// Wraps a [`Repo`] with timeouts, retries and per-address status.
pub struct DocumentResolver {
    repo: Arc<dyn Repo>,
    config: ResolverConfig,
    statuses: DashMap<String, AddressStatus>,
    observer: Option<Arc<dyn ResolverObserver>>,
}

impl DocumentResolver {
    pub fn new(repo: Arc<dyn Repo>, config: ResolverConfig) -> Self {
        Self {
            repo,
            config,
            statuses: DashMap::new(),
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn ResolverObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn repo(&self) -> &Arc<dyn Repo> {
        &self.repo
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Start tracking an address in `pending` without resolving it.
    pub fn track(&self, address: &str) {
        self.statuses
            .entry(address.to_string())
            .or_insert_with(AddressStatus::pending);
    }

    pub fn status(&self, address: &str) -> Option<AddressStatus> {
        self.statuses.get(address).map(|s| s.clone())
    }

    /// All tracked addresses, sorted by address.
    pub fn snapshot(&self) -> Vec<(String, AddressStatus)> {
        let mut all: Vec<_> = self
            .statuses
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }

    /// Stop tracking an address.
    pub fn forget(&self, address: &str) {
        self.statuses.remove(address);
    }

    /// Resolve a personal document: ready once it has a DID and a version.
    pub async fn resolve_personal(&self, address: &str) -> Result<Arc<dyn DocHandle>, SyncError> {
        self.resolve_when(address, PersonalDocument::is_ready_value)
            .await
    }

    /// Resolve with the resolver's own retry policy.
    pub async fn resolve_when<F>(
        &self,
        address: &str,
        ready: F,
    ) -> Result<Arc<dyn DocHandle>, SyncError>
    where
        F: Fn(&Value) -> bool + Send + Sync,
    {
        let config = self.config.clone();
        self.resolve_with(address, &config, ready).await
    }

    /// Resolve with a caller-specific retry policy.
    pub async fn resolve_with<F>(
        &self,
        address: &str,
        config: &ResolverConfig,
        ready: F,
    ) -> Result<Arc<dyn DocHandle>, SyncError>
    where
        F: Fn(&Value) -> bool + Send + Sync,
    {
        // Only the caller that moved the address into `loading` drives its
        // status; concurrent callers resolve without touching it.
        let owner = self.begin(address)?;
        let mut ownership = Ownership {
            resolver: self,
            address,
            settled: !owner,
        };
        let max_attempts = config.max_attempts.max(1);
        let mut last = AttemptFailure::TimedOut;

        for attempt in 0..max_attempts {
            if attempt > 0 && owner {
                let reason = describe(&last, config);
                self.step(address, LoadEvent::Retry, attempt, Some(reason))?;
            }

            match tokio::time::timeout(config.attempt_timeout(), self.attempt(address, &ready))
                .await
            {
                Ok(Ok(handle)) => {
                    if owner {
                        self.step(address, LoadEvent::Resolve, attempt, None)?;
                    }
                    ownership.settled = true;
                    tracing::debug!(address = %address, attempt, "document ready");
                    return Ok(handle);
                }
                Ok(Err(e)) => {
                    tracing::debug!(address = %address, attempt, error = %e, "resolve attempt failed");
                    last = AttemptFailure::Failed(e);
                }
                Err(_) => {
                    tracing::debug!(address = %address, attempt, "resolve attempt timed out");
                    last = AttemptFailure::TimedOut;
                }
            }

            if attempt + 1 < max_attempts {
                tokio::time::sleep(config.backoff(attempt)).await;
            }
        }

        let reason = describe(&last, config);
        let last_attempt = max_attempts - 1;
        tracing::warn!(
            address = %address,
            attempts = max_attempts,
            error = %reason,
            "document resolution exhausted"
        );

        match last {
            AttemptFailure::TimedOut => {
                if owner {
                    self.step(address, LoadEvent::Expire, last_attempt, Some(reason))?;
                }
                ownership.settled = true;
                Err(SyncError::Timeout {
                    address: address.to_string(),
                    attempts: max_attempts,
                })
            }
            AttemptFailure::Failed(_) => {
                if owner {
                    self.step(address, LoadEvent::Fail, last_attempt, Some(reason.clone()))?;
                }
                ownership.settled = true;
                Err(SyncError::Exhausted {
                    address: address.to_string(),
                    attempts: max_attempts,
                    last_error: reason,
                })
            }
        }
    }

    async fn attempt<F>(&self, address: &str, ready: &F) -> Result<Arc<dyn DocHandle>, SyncError>
    where
        F: Fn(&Value) -> bool + Send + Sync,
    {
        let handle = self.repo.find(address).await?;
        let mut rx = handle.watch();
        let populated = rx
            .wait_for(|value| value.as_ref().is_some_and(|v| ready(v)))
            .await
            .is_ok();
        if !populated {
            return Err(SyncError::Closed(address.to_string()));
        }
        Ok(handle)
    }

    /// Move the address into `loading`, resetting a finished resolution.
    /// Returns `false` when another resolution already owns it.
    fn begin(&self, address: &str) -> Result<bool, SyncError> {
        let current = self
            .status(address)
            .map(|s| s.status)
            .unwrap_or(LoadStatus::Pending);
        if current == LoadStatus::Loading {
            return Ok(false);
        }
        if current.is_final() {
            self.step(address, LoadEvent::Reset, 0, None)?;
        }
        self.step(address, LoadEvent::Start, 0, None)?;
        Ok(true)
    }

    fn step(
        &self,
        address: &str,
        event: LoadEvent,
        attempt: u32,
        error: Option<String>,
    ) -> Result<LoadStatus, SyncError> {
        let change = {
            let mut entry = self
                .statuses
                .entry(address.to_string())
                .or_insert_with(AddressStatus::pending);
            let from = entry.status;
            let to = LoadStateMachine::transition(from, event)?;
            entry.status = to;
            entry.attempts = match to {
                LoadStatus::Pending => 0,
                _ => attempt + 1,
            };
            entry.last_error = error.clone();
            StatusChange {
                address: address.to_string(),
                from,
                to,
                attempt,
                error,
            }
        };

        if let Some(observer) = &self.observer {
            observer.on_status(&change);
        }
        Ok(change.to)
    }
}

/// Held by the resolution that owns an address. Dropped before a final
/// status is reached (the future was cancelled or a step failed), it puts
/// the address back to `pending` so the next caller can own it.
struct Ownership<'a> {
    resolver: &'a DocumentResolver,
    address: &'a str,
    settled: bool,
}

impl Drop for Ownership<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        if let Some(mut entry) = self.resolver.statuses.get_mut(self.address) {
            if entry.status == LoadStatus::Loading {
                *entry = AddressStatus::pending();
                tracing::debug!(address = %self.address, "resolution abandoned");
            }
        }
    }
}

fn describe(failure: &AttemptFailure, config: &ResolverConfig) -> String {
    match failure {
        AttemptFailure::TimedOut => format!(
            "attempt timed out after {}ms",
            config.attempt_timeout().as_millis()
        ),
        AttemptFailure::Failed(e) => e.to_string(),
    }
}
