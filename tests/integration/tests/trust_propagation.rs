//! Alice trusts Bob in person; the attestation reaches Bob's document and
//! shapes both parties' discovery.

use std::time::Duration;

use narrative_core::{DiscoverySource, SignatureStatus, TrustExchangeUri};
use narrative_crypto::verify_attestation;
use narrative_integration_tests::Network;
use narrative_trust::PropagationOutcome;

const WAIT: Duration = Duration::from_secs(30);

#[tokio::test]
async fn test_attestation_reaches_counterparty_signed() {
    let net = Network::new();
    let alice = net.join(1, "Alice");
    let bob = net.join(2, "Bob");

    // Alice scans Bob's QR code.
    let exchange = TrustExchangeUri::parse(&bob.exchange_uri()).unwrap();
    let outcome = alice
        .protocol
        .trust_user(exchange.did.uri(), exchange.user_doc.as_deref())
        .unwrap();
    let delivered = outcome.propagation.unwrap().await.unwrap();
    assert_eq!(
        delivered,
        PropagationOutcome::Delivered {
            address: bob.address.clone()
        }
    );

    let bob_doc = bob.document();
    let received = bob_doc.trust_received.get(alice.did()).unwrap();
    assert_eq!(received, &outcome.attestation);
    assert!(verify_attestation(received).valid);
    assert_eq!(
        received.truster_user_doc_url.as_deref(),
        Some(alice.address.as_str())
    );

    let alice_doc = alice.document();
    assert!(alice_doc.trust_given.contains_key(bob.did()));
}

#[tokio::test]
async fn test_counterparty_discovers_truster_at_trust_priority() {
    let net = Network::new();
    let alice = net.join(1, "Alice");
    let bob = net.join(2, "Bob");

    let outcome = alice
        .protocol
        .trust_user(bob.did(), Some(&bob.address))
        .unwrap();
    outcome.propagation.unwrap().await.unwrap();

    let engine = bob.discovery();
    let snapshot = engine
        .wait_until(WAIT, |s| s.profile(alice.did()).is_some())
        .await
        .unwrap();
    let seen = snapshot.profile(alice.did()).unwrap();
    assert_eq!(seen.profile.discovery_source, DiscoverySource::TrustReceived);
    assert!(seen.profile.discovery_source.is_trust());
    assert_eq!(seen.profile.display_name.as_deref(), Some("Alice"));
    assert_eq!(seen.profile.signature_status, SignatureStatus::Valid);
    assert!(seen.flags.is_trust_received);
    assert!(!seen.flags.is_mutual_trust);
    engine.shutdown().await;
}

#[tokio::test]
async fn test_trust_back_makes_it_mutual_everywhere() {
    let net = Network::new();
    let alice = net.join(1, "Alice");
    let bob = net.join(2, "Bob");

    let (_subscription, mut mutual) = alice.protocol.watch_mutual();
    let engine = alice.discovery();

    let outcome = alice
        .protocol
        .trust_user(bob.did(), Some(&bob.address))
        .unwrap();
    outcome.propagation.unwrap().await.unwrap();

    let pending = bob
        .notifications
        .pending_attestations(&bob.document())
        .unwrap();
    assert_eq!(pending.len(), 1);

    let back = bob
        .protocol
        .trust_back(alice.did(), &bob.notifications)
        .unwrap();
    assert_eq!(
        back.propagation.unwrap().await.unwrap(),
        PropagationOutcome::Delivered {
            address: alice.address.clone()
        }
    );

    let signal = tokio::time::timeout(WAIT, mutual.recv()).await.unwrap().unwrap();
    assert_eq!(signal.did, bob.did());

    assert!(bob
        .notifications
        .pending_attestations(&bob.document())
        .unwrap()
        .is_empty());

    let snapshot = engine
        .wait_until(WAIT, |s| {
            s.profile(bob.did()).is_some_and(|p| p.flags.is_mutual_trust)
        })
        .await
        .unwrap();
    assert!(snapshot
        .profile(bob.did())
        .unwrap()
        .profile
        .discovery_source
        .is_first_degree());
    engine.shutdown().await;
}

#[tokio::test]
async fn test_revocation_is_local_only() {
    let net = Network::new();
    let alice = net.join(1, "Alice");
    let bob = net.join(2, "Bob");

    let outcome = alice
        .protocol
        .trust_user(bob.did(), Some(&bob.address))
        .unwrap();
    outcome.propagation.unwrap().await.unwrap();

    let removed = alice.protocol.revoke_trust(bob.did()).unwrap();
    assert!(removed.is_some());
    assert!(!alice.document().trust_given.contains_key(bob.did()));
    assert!(bob.document().trust_received.contains_key(alice.did()));
}
