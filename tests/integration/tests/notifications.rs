//! Which incoming attestations prompt the user, across signature states
//! and the seen set.

use narrative_core::{PersonalDocument, TrustAttestation, TrustPolicy};
use narrative_crypto::sign_attestation;
use narrative_integration_tests::{Network, Party};
use narrative_sync::update_doc;
use narrative_trust::SeenStore;

fn deliver(target: &Party, attestation: TrustAttestation) {
    update_doc(
        target.protocol.own_document().as_ref(),
        |doc: &mut PersonalDocument| {
            doc.trust_received
                .insert(attestation.truster_did.clone(), attestation);
        },
    )
    .unwrap();
}

fn signed_by(from: &Party, to: &Party) -> TrustAttestation {
    sign_attestation(
        TrustAttestation::new(from.did(), to.did()).with_truster_doc(Some(from.address.clone())),
        from.signer.as_ref(),
    )
    .unwrap()
}

#[tokio::test]
async fn test_unsigned_accepted_garbage_rejected_and_seen() {
    let net = Network::new();
    let bob = net.join(2, "Bob");
    let alice = net.join(1, "Alice");
    let carol = net.join(3, "Carol");

    let unsigned = TrustAttestation::new(alice.did(), bob.did());
    let mut garbage = TrustAttestation::new(carol.did(), bob.did());
    garbage.signature = Some("not-a-signature".into());
    deliver(&bob, unsigned.clone());
    deliver(&bob, garbage.clone());

    let pending = bob
        .notifications
        .pending_attestations(&bob.document())
        .unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, unsigned.id);

    // The garbage one is recorded as seen right away; the unsigned one is not.
    let ctx = bob.notifications.context();
    assert!(bob.seen.is_seen(ctx, &garbage.id).unwrap());
    assert!(!bob.seen.is_seen(ctx, &unsigned.id).unwrap());
}

#[tokio::test]
async fn test_signature_from_wrong_key_is_rejected() {
    let net = Network::new();
    let bob = net.join(2, "Bob");
    let alice = net.join(1, "Alice");
    let mallory = net.join(6, "Mallory");

    // Mallory's signature on an attestation claiming Alice as truster.
    let mut forged = signed_by(&mallory, &bob);
    forged.truster_did = alice.did().to_string();
    deliver(&bob, forged);

    assert!(bob
        .notifications
        .pending_attestations(&bob.document())
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_require_signatures_holds_unsigned_back() {
    let net = Network::with_config(
        narrative_core::ResolverConfig::quick(),
        TrustPolicy {
            require_signatures: true,
        },
    );
    let bob = net.join(2, "Bob");
    let alice = net.join(1, "Alice");
    let carol = net.join(3, "Carol");

    deliver(&bob, TrustAttestation::new(alice.did(), bob.did()));
    deliver(&bob, signed_by(&carol, &bob));

    let pending = bob
        .notifications
        .pending_attestations(&bob.document())
        .unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].truster_did, carol.did());
}

#[tokio::test]
async fn test_excluded_when_trusted_back_or_seen() {
    let net = Network::new();
    let bob = net.join(2, "Bob");
    let alice = net.join(1, "Alice");
    let carol = net.join(3, "Carol");
    let dave = net.join(4, "Dave");

    for from in [&alice, &carol, &dave] {
        deliver(&bob, signed_by(from, &bob));
    }
    assert_eq!(
        bob.notifications
            .pending_attestations(&bob.document())
            .unwrap()
            .len(),
        3
    );

    // Bob already trusts Alice; Carol's attestation is dismissed.
    bob.protocol.trust_user(alice.did(), None).unwrap();
    let carol_id = bob.document().trust_received[carol.did()].id.clone();
    bob.notifications.decline(&carol_id).unwrap();

    let pending = bob
        .notifications
        .pending_attestations(&bob.document())
        .unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].truster_did, dave.did());

    // Every remaining entry passes the exclusion rule.
    let doc = bob.document();
    for attestation in &pending {
        assert!(!doc.trust_given.contains_key(&attestation.truster_did));
        assert_ne!(attestation.id, carol_id);
    }
}
