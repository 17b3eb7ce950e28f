//! The profile discovery engine.
//!
//! A single task owns the `DID -> KnownProfile` map and the tracked-address
//! map. Resolutions and subscriptions run on their own tasks and report back
//! over one event channel, so every mutation of either map happens in that
//! owner task. Readers get immutable snapshots through a `watch` channel.

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use narrative_core::{
    Did, DiscoverySource, KnownProfile, PersonalDocument, SignatureStatus, TrustAttestation,
    TrustFlags, WorkspaceDocument,
};
use narrative_crypto::profile_signature_status;
use narrative_sync::{on_mutation, AddressStatus, DocHandle, DocumentResolver, Subscription};

use crate::error::DiscoveryError;
use crate::observer::DiscoveryObserver;
use crate::priority::merge_profile;

/// Discovery-level state of one tracked address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum TrackState {
    /// Resolution in progress.
    Resolving,
    /// Resolved and subscribed.
    Live,
    /// Resolution gave up. See the resolver status for details.
    Unreachable { reason: String },
    /// The document at the address belongs to another DID; its data was
    /// discarded.
    Mismatch { expected: String, found: String },
}

/// Diagnostic view of one tracked address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedAddress {
    pub address: String,
    /// DID expected at the address.
    pub did: String,
    pub source: DiscoverySource,
    pub state: TrackState,
    pub load: Option<AddressStatus>,
}

/// A known profile with its trust flags against the local document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveredProfile {
    #[serde(flatten)]
    pub profile: KnownProfile,
    #[serde(flatten)]
    pub flags: TrustFlags,
}

/// Immutable view of the engine state.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiscoverySnapshot {
    /// Sorted by DID.
    pub profiles: Vec<DiscoveredProfile>,
    /// Sorted by address.
    pub tracked: Vec<TrackedAddress>,
}

impl DiscoverySnapshot {
    pub fn profile(&self, did: &str) -> Option<&DiscoveredProfile> {
        self.profiles.iter().find(|p| p.profile.did == did)
    }

    pub fn tracked(&self, address: &str) -> Option<&TrackedAddress> {
        self.tracked.iter().find(|t| t.address == address)
    }

    /// No tracked address is still resolving, and every live address has
    /// delivered its profile.
    pub fn is_settled(&self) -> bool {
        self.tracked.iter().all(|t| match t.state {
            TrackState::Resolving => false,
            TrackState::Live => self.profile(&t.did).is_some(),
            _ => true,
        })
    }
}

enum EngineEvent {
    Resolved {
        address: String,
        generation: u64,
        result: Result<Arc<dyn DocHandle>, String>,
    },
    Changed {
        address: String,
        generation: u64,
        value: Value,
    },
    RegisterExternal {
        did: String,
        address: String,
    },
    UnregisterExternal {
        did: String,
    },
    Workspace {
        context: String,
        document: WorkspaceDocument,
    },
    Retry {
        address: String,
    },
    Shutdown,
}

/// Handle to a running discovery engine.
pub struct DiscoveryEngine {
    events: mpsc::UnboundedSender<EngineEvent>,
    snapshot: watch::Receiver<DiscoverySnapshot>,
    task: Option<JoinHandle<()>>,
}

impl DiscoveryEngine {
    /// Start discovery seeded with the local identity's own document.
    pub fn spawn(
        resolver: Arc<DocumentResolver>,
        self_did: &str,
        self_address: &str,
        observer: Option<Arc<dyn DiscoveryObserver>>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(DiscoverySnapshot::default());

        let crawler = Crawler {
            resolver,
            events: events_tx.clone(),
            snapshot: snapshot_tx,
            observer,
            self_did: self_did.to_string(),
            self_address: self_address.to_string(),
            profiles: BTreeMap::new(),
            tracked: BTreeMap::new(),
            external: BTreeMap::new(),
            workspaces: BTreeMap::new(),
            next_generation: 0,
        };
        let task = tokio::spawn(crawler.run(events_rx));

        tracing::info!(did = %self_did, address = %self_address, "discovery started");

        Self {
            events: events_tx,
            snapshot: snapshot_rx,
            task: Some(task),
        }
    }

    /// Track a DID/address pair learned out of band, before any trust.
    pub fn register_external(&self, did: &str, address: &str) -> Result<(), DiscoveryError> {
        let did = Did::new(did).map_err(|e| DiscoveryError::InvalidDid(e.to_string()))?;
        self.send(EngineEvent::RegisterExternal {
            did: did.uri().to_string(),
            address: address.to_string(),
        })
    }

    pub fn unregister_external(&self, did: &str) -> Result<(), DiscoveryError> {
        self.send(EngineEvent::UnregisterExternal {
            did: did.to_string(),
        })
    }

    /// Replace the identity table contributed by one collaborative document.
    pub fn update_workspace(&self, context: &str, document: &Value) -> Result<(), DiscoveryError> {
        self.send(EngineEvent::Workspace {
            context: context.to_string(),
            document: WorkspaceDocument::from_value(document),
        })
    }

    /// Resolve an unreachable address again.
    pub fn retry(&self, address: &str) -> Result<(), DiscoveryError> {
        self.send(EngineEvent::Retry {
            address: address.to_string(),
        })
    }

    pub fn snapshot(&self) -> DiscoverySnapshot {
        self.snapshot.borrow().clone()
    }

    /// A receiver notified after every engine update.
    pub fn changes(&self) -> watch::Receiver<DiscoverySnapshot> {
        self.snapshot.clone()
    }

    /// Wait, at most `timeout`, for a snapshot satisfying `predicate`.
    pub async fn wait_until<F>(
        &self,
        timeout: Duration,
        predicate: F,
    ) -> Result<DiscoverySnapshot, DiscoveryError>
    where
        F: Fn(&DiscoverySnapshot) -> bool,
    {
        let mut rx = self.snapshot.clone();
        let result = match tokio::time::timeout(timeout, rx.wait_for(|s| predicate(s))).await {
            Ok(Ok(snapshot)) => Ok(snapshot.clone()),
            Ok(Err(_)) => Err(DiscoveryError::Closed),
            Err(_) => Err(DiscoveryError::Timeout),
        };
        result
    }

    /// Stop the engine, cancelling every subscription and pending resolution.
    pub async fn shutdown(mut self) {
        let _ = self.events.send(EngineEvent::Shutdown);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "discovery task ended abnormally");
            }
        }
    }

    fn send(&self, event: EngineEvent) -> Result<(), DiscoveryError> {
        self.events.send(event).map_err(|_| DiscoveryError::Closed)
    }
}

impl Drop for DiscoveryEngine {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

struct Tracked {
    did: String,
    source: DiscoverySource,
    state: TrackState,
    /// Distinguishes events of this tracking from a previous one of the
    /// same address.
    generation: u64,
    resolving: Option<JoinHandle<()>>,
    subscription: Option<Subscription>,
    last_doc: Option<PersonalDocument>,
}

impl Tracked {
    fn cancel(&mut self) {
        if let Some(task) = self.resolving.take() {
            task.abort();
        }
        self.subscription = None;
    }
}

struct Crawler {
    resolver: Arc<DocumentResolver>,
    events: mpsc::UnboundedSender<EngineEvent>,
    snapshot: watch::Sender<DiscoverySnapshot>,
    observer: Option<Arc<dyn DiscoveryObserver>>,
    self_did: String,
    self_address: String,
    profiles: BTreeMap<String, KnownProfile>,
    /// address -> tracking
    tracked: BTreeMap<String, Tracked>,
    /// did -> address
    external: BTreeMap<String, String>,
    /// context -> identity table
    workspaces: BTreeMap<String, WorkspaceDocument>,
    next_generation: u64,
}

impl Crawler {
    async fn run(mut self, mut events: mpsc::UnboundedReceiver<EngineEvent>) {
        let self_address = self.self_address.clone();
        let self_did = self.self_did.clone();
        self.track(&self_address, &self_did, DiscoverySource::SelfDoc);
        self.publish();

        while let Some(event) = events.recv().await {
            match event {
                EngineEvent::Resolved {
                    address,
                    generation,
                    result,
                } => self.on_resolved(&address, generation, result),
                EngineEvent::Changed {
                    address,
                    generation,
                    value,
                } => self.on_changed(&address, generation, value),
                EngineEvent::RegisterExternal { did, address } => {
                    tracing::debug!(did = %did, address = %address, "external registration");
                    self.external.insert(did.clone(), address.clone());
                    self.track(&address, &did, DiscoverySource::External);
                    self.reconcile();
                }
                EngineEvent::UnregisterExternal { did } => {
                    if self.external.remove(&did).is_some() {
                        self.reconcile();
                    }
                }
                EngineEvent::Workspace { context, document } => {
                    self.workspaces.insert(context, document);
                    self.apply_workspaces();
                }
                EngineEvent::Retry { address } => self.retry(&address),
                EngineEvent::Shutdown => break,
            }
            self.publish();
        }

        for (_, mut entry) in std::mem::take(&mut self.tracked) {
            entry.cancel();
        }
        tracing::info!(did = %self.self_did, "discovery stopped");
    }

    /// Start tracking an address, or upgrade the source of an existing one.
    fn track(&mut self, address: &str, did: &str, source: DiscoverySource) {
        if let Some(entry) = self.tracked.get_mut(address) {
            let upgrade = source.priority() > entry.source.priority()
                || (source.is_first_degree() && entry.source == DiscoverySource::SecondDegree);
            if upgrade && entry.did == did {
                tracing::debug!(
                    address = %address,
                    from = %entry.source,
                    to = %source,
                    "tracked source upgraded"
                );
                entry.source = source;
                self.apply_profile(address);
            }
            return;
        }

        let generation = self.bump_generation();
        let resolving = self.spawn_resolution(address, generation);
        self.tracked.insert(
            address.to_string(),
            Tracked {
                did: did.to_string(),
                source,
                state: TrackState::Resolving,
                generation,
                resolving: Some(resolving),
                subscription: None,
                last_doc: None,
            },
        );
        tracing::debug!(address = %address, did = %did, source = %source, "tracking address");
        self.notify_state(address, &TrackState::Resolving);
    }

    fn untrack(&mut self, address: &str) {
        let Some(mut entry) = self.tracked.remove(address) else {
            return;
        };
        entry.cancel();
        self.resolver.forget(address);
        tracing::debug!(address = %address, did = %entry.did, "address left the trust graph");

        let owned = self
            .profiles
            .get(&entry.did)
            .is_some_and(|p| p.user_doc_url.as_deref() == Some(address));
        if !owned {
            return;
        }
        self.profiles.remove(&entry.did);

        // another document of the same DID may still be live
        let remaining: Vec<String> = self
            .tracked
            .iter()
            .filter(|(_, t)| t.did == entry.did && t.last_doc.is_some())
            .map(|(address, _)| address.clone())
            .collect();
        for address in &remaining {
            self.apply_profile(address);
        }
        if !self.profiles.contains_key(&entry.did) {
            if let Some(observer) = &self.observer {
                observer.on_profile_removed(&entry.did);
            }
        }
    }

    fn retry(&mut self, address: &str) {
        let generation = self.bump_generation();
        let Some(entry) = self.tracked.get(address) else {
            return;
        };
        if !matches!(entry.state, TrackState::Unreachable { .. }) {
            return;
        }
        let resolving = self.spawn_resolution(address, generation);
        if let Some(entry) = self.tracked.get_mut(address) {
            entry.generation = generation;
            entry.resolving = Some(resolving);
            entry.state = TrackState::Resolving;
        }
        self.notify_state(address, &TrackState::Resolving);
    }

    fn bump_generation(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }

    fn spawn_resolution(&self, address: &str, generation: u64) -> JoinHandle<()> {
        let resolver = self.resolver.clone();
        let events = self.events.clone();
        let address = address.to_string();
        tokio::spawn(async move {
            let result = resolver
                .resolve_personal(&address)
                .await
                .map_err(|e| e.to_string());
            let _ = events.send(EngineEvent::Resolved {
                address,
                generation,
                result,
            });
        })
    }

    fn on_resolved(
        &mut self,
        address: &str,
        generation: u64,
        result: Result<Arc<dyn DocHandle>, String>,
    ) {
        let events = self.events.clone();
        let Some(entry) = self.tracked.get_mut(address) else {
            return;
        };
        if entry.generation != generation {
            return;
        }
        entry.resolving = None;

        entry.state = match result {
            Ok(handle) => {
                let changed_address = address.to_string();
                entry.subscription = Some(on_mutation(handle, move |value| {
                    let _ = events.send(EngineEvent::Changed {
                        address: changed_address.clone(),
                        generation,
                        value,
                    });
                }));
                TrackState::Live
            }
            Err(reason) => {
                tracing::warn!(address = %address, did = %entry.did, error = %reason, "profile document unreachable");
                TrackState::Unreachable { reason }
            }
        };
        let state = entry.state.clone();
        self.notify_state(address, &state);
    }

    fn on_changed(&mut self, address: &str, generation: u64, value: Value) {
        let Some(entry) = self.tracked.get_mut(address) else {
            return;
        };
        if entry.generation != generation {
            return;
        }

        let doc: PersonalDocument = match serde_json::from_value(value) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::warn!(address = %address, error = %e, "document does not decode");
                return;
            }
        };

        if doc.did != entry.did {
            tracing::warn!(
                address = %address,
                expected = %entry.did,
                found = %doc.did,
                "document DID mismatch"
            );
            let state = TrackState::Mismatch {
                expected: entry.did.clone(),
                found: doc.did,
            };
            entry.state = state.clone();
            entry.subscription = None;
            entry.last_doc = None;
            self.notify_state(address, &state);
            self.reconcile();
            return;
        }

        let crawls = address == self.self_address || entry.source.is_first_degree();
        entry.last_doc = Some(doc);
        self.apply_profile(address);
        if crawls {
            self.reconcile();
        }
    }

    /// Merge the profile of a tracked address's latest document.
    fn apply_profile(&mut self, address: &str) {
        let Some(entry) = self.tracked.get(address) else {
            return;
        };
        let Some(doc) = &entry.last_doc else {
            return;
        };
        let incoming = KnownProfile {
            did: entry.did.clone(),
            display_name: doc.profile.display_name.clone(),
            avatar_url: doc.profile.avatar_url.clone(),
            user_doc_url: Some(address.to_string()),
            discovery_source: entry.source,
            signature_status: profile_signature_status(&doc.profile, &entry.did),
            last_updated: doc.profile.updated_at,
        };
        if incoming.signature_status == SignatureStatus::Invalid {
            tracing::warn!(did = %incoming.did, address = %address, "profile signature invalid");
        }
        self.upsert(incoming);
    }

    fn upsert(&mut self, incoming: KnownProfile) {
        let did = incoming.did.clone();
        let (merged, outcome) = merge_profile(self.profiles.get(&did), incoming);
        if !outcome.changed() {
            return;
        }
        tracing::debug!(did = %did, source = %merged.discovery_source, outcome = ?outcome, "profile merged");
        if let Some(observer) = &self.observer {
            observer.on_profile(&merged, outcome);
        }
        self.profiles.insert(did, merged);
    }

    /// Recompute the reachable address set from the local document and the
    /// first-degree documents, then track new addresses and tear down the
    /// ones nothing reaches any more.
    fn reconcile(&mut self) {
        let self_doc = self
            .tracked
            .get(&self.self_address)
            .and_then(|t| t.last_doc.clone());

        // address -> (did, source)
        let mut desired: BTreeMap<String, (String, DiscoverySource)> = BTreeMap::new();
        let mut known_dids: HashSet<String> = HashSet::from([self.self_did.clone()]);

        if let Some(doc) = &self_doc {
            for (did, hint, source) in counterparties(doc) {
                if did == self.self_did {
                    continue;
                }
                known_dids.insert(did.clone());
                let address = hint
                    .or_else(|| self.external.get(&did).cloned())
                    .or_else(|| self.address_of(&did));
                if let Some(address) = address {
                    desired.entry(address).or_insert((did, source));
                }
            }
        }

        let first_degree_docs: Vec<PersonalDocument> = desired
            .keys()
            .filter_map(|address| self.tracked.get(address))
            .filter_map(|t| t.last_doc.clone())
            .collect();
        for doc in &first_degree_docs {
            for (did, hint, _) in counterparties(doc) {
                if known_dids.contains(&did) {
                    continue;
                }
                // a DID already crawled keeps the address it was crawled at
                let Some(address) = self.address_of(&did).or(hint) else {
                    continue;
                };
                known_dids.insert(did.clone());
                desired
                    .entry(address)
                    .or_insert((did, DiscoverySource::SecondDegree));
            }
        }

        for (address, (did, source)) in &desired {
            self.track(address, did, *source);
        }

        let stale: Vec<String> = self
            .tracked
            .keys()
            .filter(|address| {
                **address != self.self_address
                    && !desired.contains_key(*address)
                    && !self.external.values().any(|e| e == *address)
            })
            .cloned()
            .collect();
        for address in stale {
            self.untrack(&address);
        }

        self.apply_workspaces();
    }

    fn address_of(&self, did: &str) -> Option<String> {
        self.tracked
            .iter()
            .find(|(_, t)| t.did == did)
            .map(|(address, _)| address.clone())
    }

    /// Add workspace identities not known from any richer source, and drop
    /// workspace entries no table mentions any more.
    fn apply_workspaces(&mut self) {
        let mut wanted = BTreeMap::new();
        for document in self.workspaces.values() {
            for (did, identity) in &document.identities {
                wanted.entry(did.clone()).or_insert_with(|| identity.clone());
            }
        }

        let gone: Vec<String> = self
            .profiles
            .values()
            .filter(|p| p.discovery_source == DiscoverySource::Workspace)
            .filter(|p| !wanted.contains_key(&p.did))
            .map(|p| p.did.clone())
            .collect();
        for did in gone {
            self.profiles.remove(&did);
            if let Some(observer) = &self.observer {
                observer.on_profile_removed(&did);
            }
        }

        for (did, identity) in wanted {
            let current = self.profiles.get(&did);
            let unchanged = current.is_some_and(|p| {
                p.discovery_source != DiscoverySource::Workspace
                    || (p.display_name == identity.display_name
                        && p.avatar_url == identity.avatar_url)
            });
            if unchanged {
                continue;
            }
            self.upsert(KnownProfile {
                did,
                display_name: identity.display_name,
                avatar_url: identity.avatar_url,
                user_doc_url: None,
                discovery_source: DiscoverySource::Workspace,
                signature_status: SignatureStatus::Missing,
                last_updated: Utc::now(),
            });
        }
    }

    fn notify_state(&self, address: &str, state: &TrackState) {
        if let Some(observer) = &self.observer {
            observer.on_track_state(address, state);
        }
    }

    fn publish(&self) {
        let self_doc = self
            .tracked
            .get(&self.self_address)
            .and_then(|t| t.last_doc.as_ref());

        let profiles = self
            .profiles
            .values()
            .map(|profile| DiscoveredProfile {
                flags: self_doc
                    .map(|doc| TrustFlags::for_did(doc, &profile.did))
                    .unwrap_or_default(),
                profile: profile.clone(),
            })
            .collect();

        let tracked = self
            .tracked
            .iter()
            .map(|(address, t)| TrackedAddress {
                address: address.clone(),
                did: t.did.clone(),
                source: t.source,
                state: t.state.clone(),
                load: self.resolver.status(address),
            })
            .collect();

        self.snapshot.send_replace(DiscoverySnapshot { profiles, tracked });
    }
}

/// Every counterparty of a document with the address hint its attestation
/// carries.
fn counterparties(doc: &PersonalDocument) -> Vec<(String, Option<String>, DiscoverySource)> {
    let given = doc.trust_given.values().map(|a: &TrustAttestation| {
        (
            a.trustee_did.clone(),
            a.trustee_user_doc_url.clone(),
            DiscoverySource::TrustGiven,
        )
    });
    let received = doc.trust_received.values().map(|a: &TrustAttestation| {
        (
            a.truster_did.clone(),
            a.truster_user_doc_url.clone(),
            DiscoverySource::TrustReceived,
        )
    });
    given.chain(received).collect()
}
