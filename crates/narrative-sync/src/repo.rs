use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::watch;

use crate::error::SyncError;

/// The replication substrate: resolves document addresses to live handles.
///
/// Implementations may take arbitrarily long or fail; callers go through
/// [`crate::DocumentResolver`] rather than calling `find` directly.
#[async_trait]
pub trait Repo: Send + Sync {
    async fn find(&self, address: &str) -> Result<Arc<dyn DocHandle>, SyncError>;

    /// Create a new document with the given initial content.
    fn create(&self, initial: Value) -> Result<Arc<dyn DocHandle>, SyncError>;
}

/// A live, replicated document.
pub trait DocHandle: Send + Sync {
    fn address(&self) -> &str;

    /// Current content, `None` while the document is still syncing in.
    fn current_value(&self) -> Option<Value>;

    /// A receiver that observes every future change of the content.
    fn watch(&self) -> watch::Receiver<Option<Value>>;

    /// Apply a local change. Fails with `NotReady` if there is no content yet.
    fn mutate(&self, change: &mut dyn FnMut(&mut Value)) -> Result<(), SyncError>;
}

/// Decode the current content of a handle.
pub fn read_doc<T: DeserializeOwned>(handle: &dyn DocHandle) -> Result<Option<T>, SyncError> {
    match handle.current_value() {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

/// Apply a typed change: decode, run `change`, re-encode in one mutation.
pub fn update_doc<T, R, F>(handle: &dyn DocHandle, change: F) -> Result<R, SyncError>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce(&mut T) -> R,
{
    let mut change = Some(change);
    let mut outcome: Option<Result<R, SyncError>> = None;

    handle.mutate(&mut |value: &mut Value| {
        let Some(change) = change.take() else {
            return;
        };
        let result = serde_json::from_value::<T>(value.clone())
            .map_err(SyncError::from)
            .and_then(|mut doc| {
                let out = change(&mut doc);
                *value = serde_json::to_value(&doc)?;
                Ok(out)
            });
        outcome = Some(result);
    })?;

    outcome.unwrap_or_else(|| Err(SyncError::NotReady(handle.address().to_string())))
}
