use narrative_core::KnownProfile;

use crate::engine::TrackState;
use crate::priority::MergeOutcome;

/// Receives discovery changes. Every method defaults to a no-op.
pub trait DiscoveryObserver: Send + Sync {
    /// A profile entry was inserted or changed.
    fn on_profile(&self, _profile: &KnownProfile, _outcome: MergeOutcome) {}

    /// A profile left the trust graph.
    fn on_profile_removed(&self, _did: &str) {}

    /// A tracked address changed state.
    fn on_track_state(&self, _address: &str, _state: &TrackState) {}
}
