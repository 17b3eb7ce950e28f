use std::fmt;

use crate::error::CoreError;

/// Load status of one tracked document address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoadStatus {
    /// Tracked, no resolution attempt started yet.
    Pending,
    /// Resolution attempts in progress.
    Loading,
    /// Resolved with populated content. Final for this resolution.
    Ready,
    /// Attempts exhausted, last failure was a resolver error. Final.
    Error,
    /// Attempts exhausted, last attempt timed out. Final.
    Timeout,
}

impl LoadStatus {
    /// Whether this is a final (terminal) state for the current resolution.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Ready | Self::Error | Self::Timeout)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Error | Self::Timeout)
    }
}

impl fmt::Display for LoadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Loading => write!(f, "loading"),
            Self::Ready => write!(f, "ready"),
            Self::Error => write!(f, "error"),
            Self::Timeout => write!(f, "timeout"),
        }
    }
}

/// Events that drive load status transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadEvent {
    /// The first attempt is issued.
    Start,
    /// An attempt failed and another one is scheduled.
    Retry,
    /// An attempt produced a ready document.
    Resolve,
    /// The last attempt failed with a resolver error.
    Fail,
    /// The last attempt timed out.
    Expire,
    /// The caller asks for a fresh resolution.
    Reset,
}

/// Load status transitions.
///
/// Valid transitions:
/// - Pending → Loading (Start)
/// - Loading → Loading (Retry)
/// - Loading → Ready (Resolve)
/// - Loading → Error (Fail)
/// - Loading → Timeout (Expire)
/// - Ready | Error | Timeout → Pending (Reset)
pub struct LoadStateMachine;

impl LoadStateMachine {
    pub fn transition(current: LoadStatus, event: LoadEvent) -> Result<LoadStatus, CoreError> {
        let next = match (current, event) {
            (LoadStatus::Pending, LoadEvent::Start) => LoadStatus::Loading,
            (LoadStatus::Loading, LoadEvent::Retry) => LoadStatus::Loading,
            (LoadStatus::Loading, LoadEvent::Resolve) => LoadStatus::Ready,
            (LoadStatus::Loading, LoadEvent::Fail) => LoadStatus::Error,
            (LoadStatus::Loading, LoadEvent::Expire) => LoadStatus::Timeout,
            (s, LoadEvent::Reset) if s.is_final() => LoadStatus::Pending,
            _ => {
                return Err(CoreError::InvalidStateTransition {
                    from: current,
                    event: format!("{:?}", event),
                })
            }
        };

        tracing::trace!(from = %current, to = %next, event = ?event, "load state transition");

        Ok(next)
    }

    pub fn can_transition(current: LoadStatus, event: LoadEvent) -> bool {
        Self::transition(current, event).is_ok()
    }
}
