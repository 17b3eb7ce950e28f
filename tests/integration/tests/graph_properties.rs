//! Invariants of the trust graph under sequences of actions.

use std::time::Duration;

use narrative_core::{DiscoverySource, TrustFlags};
use narrative_integration_tests::Network;
use narrative_trust::AttestationStore;

const WAIT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy)]
enum Action {
    AliceTrusts,
    AliceRevokes,
    BobTrusts,
    BobRevokes,
}

const ACTIONS: [Action; 4] = [
    Action::AliceTrusts,
    Action::AliceRevokes,
    Action::BobTrusts,
    Action::BobRevokes,
];

#[tokio::test]
async fn test_single_attestation_per_pair() {
    let net = Network::new();
    let alice = net.join(1, "Alice");
    let bob = net.join(2, "Bob");

    let mut ids = Vec::new();
    let mut last = None;
    for _ in 0..5 {
        let outcome = alice
            .protocol
            .trust_user(bob.did(), Some(&bob.address))
            .unwrap();
        outcome.propagation.unwrap().await.unwrap();
        ids.push(outcome.attestation.id.clone());
        last = Some(outcome.attestation);
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    let last = last.unwrap();

    let given = alice.document().trust_given;
    assert_eq!(given.len(), 1);
    assert_eq!(given[bob.did()].updated_at, last.updated_at);
    assert!(ids.iter().all(|id| *id == ids[0]));

    let received = bob.document().trust_received;
    assert_eq!(received.len(), 1);
    assert_eq!(received[alice.did()], last);
}

#[tokio::test]
async fn test_mutual_flag_tracks_both_directions() {
    for a in ACTIONS {
        for b in ACTIONS {
            for c in ACTIONS {
                check_sequence(&[a, b, c]).await;
            }
        }
    }
}

async fn check_sequence(actions: &[Action]) {
    let net = Network::new();
    let alice = net.join(1, "Alice");
    let bob = net.join(2, "Bob");

    let mut alice_gives = false;
    let mut bob_ever_gave = false;
    for action in actions {
        match action {
            Action::AliceTrusts => {
                let outcome = alice
                    .protocol
                    .trust_user(bob.did(), Some(&bob.address))
                    .unwrap();
                outcome.propagation.unwrap().await.unwrap();
                alice_gives = true;
            }
            Action::AliceRevokes => {
                alice.protocol.revoke_trust(bob.did()).unwrap();
                alice_gives = false;
            }
            Action::BobTrusts => {
                let outcome = bob
                    .protocol
                    .trust_user(alice.did(), Some(&alice.address))
                    .unwrap();
                outcome.propagation.unwrap().await.unwrap();
                bob_ever_gave = true;
            }
            // Revocation stays in Bob's document.
            Action::BobRevokes => {
                bob.protocol.revoke_trust(alice.did()).unwrap();
            }
        }

        let doc = alice.document();
        let flags = TrustFlags::for_did(&doc, bob.did());
        assert_eq!(flags.is_trust_given, alice_gives, "{:?}", actions);
        assert_eq!(flags.is_trust_received, bob_ever_gave, "{:?}", actions);
        assert_eq!(
            doc.is_mutual_trust(bob.did()),
            alice_gives && bob_ever_gave,
            "{:?}",
            actions
        );
        assert_eq!(flags.is_mutual_trust, doc.is_mutual_trust(bob.did()));
    }
}

#[tokio::test]
async fn test_discovery_source_never_downgrades() {
    let net = Network::new();
    let alice = net.join(1, "Alice");
    let wanda = net.join(7, "Wanda");
    let engine = alice.discovery();

    // Known only through a shared workspace at first.
    engine
        .update_workspace(
            "ws",
            &serde_json::json!({ "identities": { wanda.did(): { "displayName": "W." } } }),
        )
        .unwrap();
    engine
        .wait_until(WAIT, |s| {
            s.profile(wanda.did())
                .is_some_and(|p| p.profile.discovery_source == DiscoverySource::Workspace)
        })
        .await
        .unwrap();

    // Trust upgrades it.
    alice
        .protocol
        .trust_user(wanda.did(), Some(&wanda.address))
        .unwrap();
    engine
        .wait_until(WAIT, |s| {
            s.profile(wanda.did())
                .is_some_and(|p| p.profile.discovery_source == DiscoverySource::TrustGiven)
        })
        .await
        .unwrap();

    // Newer lower-priority inputs leave the source alone.
    engine
        .update_workspace(
            "ws",
            &serde_json::json!({ "identities": { wanda.did(): { "displayName": "Wanda (ws)" } } }),
        )
        .unwrap();
    engine
        .register_external(wanda.did(), &wanda.address)
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let snapshot = engine.snapshot();
    let profile = &snapshot.profile(wanda.did()).unwrap().profile;
    assert_eq!(profile.discovery_source, DiscoverySource::TrustGiven);
    assert_eq!(profile.display_name.as_deref(), Some("Wanda"));
    engine.shutdown().await;
}
