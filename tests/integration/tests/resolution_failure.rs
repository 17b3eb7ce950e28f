//! A document that never answers: ten timed-out attempts with exponential
//! backoff, then a final timeout status and no profile.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use narrative_core::{KnownProfile, LoadStatus, ResolverConfig, TrustPolicy};
use narrative_discovery::{DiscoveryEngine, DiscoveryObserver, MergeOutcome, TrackState};
use narrative_integration_tests::Network;
use narrative_sync::{DocumentResolver, Fault, ResolverObserver, StatusChange};
use narrative_trust::PropagationOutcome;

#[derive(Default)]
struct Recorder {
    changes: Mutex<Vec<StatusChange>>,
    profiles: Mutex<Vec<String>>,
}

impl ResolverObserver for Recorder {
    fn on_status(&self, change: &StatusChange) {
        self.changes.lock().unwrap().push(change.clone());
    }
}

impl DiscoveryObserver for Recorder {
    fn on_profile(&self, profile: &KnownProfile, _outcome: MergeOutcome) {
        self.profiles.lock().unwrap().push(profile.did.clone());
    }
}

#[tokio::test(start_paused = true)]
async fn test_ten_timeouts_end_in_timeout_without_profile() {
    let net = Network::with_config(ResolverConfig::default(), TrustPolicy::default());
    let alice = net.join(1, "Alice");
    let xavier = net.join(9, "Xavier");
    net.repo.set_fault(&xavier.address, Fault::Hang);

    let recorder = Arc::new(Recorder::default());
    let resolver = Arc::new(
        DocumentResolver::new(net.repo.clone(), ResolverConfig::default())
            .with_observer(recorder.clone()),
    );
    let engine = DiscoveryEngine::spawn(
        resolver.clone(),
        alice.did(),
        &alice.address,
        Some(recorder.clone() as Arc<dyn DiscoveryObserver>),
    );

    let started = tokio::time::Instant::now();
    engine
        .register_external(xavier.did(), &xavier.address)
        .unwrap();
    let snapshot = engine
        .wait_until(Duration::from_secs(3600), |s| {
            s.tracked(&xavier.address)
                .is_some_and(|t| matches!(t.state, TrackState::Unreachable { .. }))
        })
        .await
        .unwrap();

    let status = resolver.status(&xavier.address).unwrap();
    assert_eq!(status.status, LoadStatus::Timeout);
    assert_eq!(status.attempts, 10);
    assert_eq!(net.repo.find_calls(&xavier.address), 10);
    // 10 x 8s attempts + 2+4+8+16+32+60+60+60+60s of backoff
    assert!(started.elapsed() >= Duration::from_secs(382));

    assert!(snapshot.profile(xavier.did()).is_none());
    assert!(!recorder
        .profiles
        .lock()
        .unwrap()
        .iter()
        .any(|did| did == xavier.did()));

    let changes = recorder.changes.lock().unwrap();
    let for_x: Vec<_> = changes
        .iter()
        .filter(|c| c.address == xavier.address)
        .collect();
    assert!(for_x.iter().all(|c| c.to != LoadStatus::Ready));
    assert_eq!(for_x.last().unwrap().to, LoadStatus::Timeout);
    drop(changes);

    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_unreachable_counterparty_keeps_local_attestation() {
    let net = Network::new();
    let alice = net.join(1, "Alice");
    let bob = net.join(2, "Bob");
    net.repo.set_fault(&bob.address, Fault::Unreachable);

    let outcome = alice
        .protocol
        .trust_user(bob.did(), Some(&bob.address))
        .unwrap();
    let propagation = outcome.propagation.unwrap().await.unwrap();
    assert!(matches!(propagation, PropagationOutcome::Unreachable { .. }));

    assert!(alice.document().trust_given.contains_key(bob.did()));
    net.repo.clear_fault(&bob.address);
    assert!(bob.document().trust_received.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_partial_outage_recovers_before_budget() {
    let net = Network::with_config(ResolverConfig::default(), TrustPolicy::default());
    let alice = net.join(1, "Alice");
    let bob = net.join(2, "Bob");
    net.repo.set_fault(&bob.address, Fault::FailTimes(4));

    let engine = alice.discovery();
    engine.register_external(bob.did(), &bob.address).unwrap();
    let snapshot = engine
        .wait_until(Duration::from_secs(3600), |s| s.profile(bob.did()).is_some())
        .await
        .unwrap();

    assert_eq!(snapshot.tracked(&bob.address).unwrap().state, TrackState::Live);
    let status = alice.resolver.status(&bob.address).unwrap();
    assert_eq!(status.status, LoadStatus::Ready);
    assert_eq!(status.attempts, 5);
    engine.shutdown().await;
}
