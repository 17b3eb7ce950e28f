//! Duplicate-suppressing mutation subscriptions.

use serde_json::Value;
use std::sync::Arc;
use tokio::task::JoinHandle;

use narrative_crypto::{fingerprint, Hash};

use crate::repo::DocHandle;

/// A live subscription to one document. Dropping it unsubscribes.
pub struct Subscription {
    address: String,
    task: JoinHandle<()>,
}

impl Subscription {
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }

    /// Unsubscribe explicitly.
    pub fn cancel(self) {
        // Drop does the abort.
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("address", &self.address)
            .field("active", &self.is_active())
            .finish()
    }
}

/// Deliver the current content of `handle` and every later change to
/// `callback`, skipping deliveries whose content equals the previous one.
///
/// Delivery runs on a spawned tokio task, so this must be called inside a
/// runtime. A handle without content yet is not delivered until it has some.
pub fn on_mutation<F>(handle: Arc<dyn DocHandle>, mut callback: F) -> Subscription
where
    F: FnMut(Value) + Send + 'static,
{
    let address = handle.address().to_string();
    let mut rx = handle.watch();
    let log_address = address.clone();

    let task = tokio::spawn(async move {
        let _handle = handle;
        let mut last: Option<Hash> = None;
        loop {
            let current = rx.borrow_and_update().clone();
            if let Some(value) = current {
                match fingerprint(&value) {
                    Ok(fp) if last == Some(fp) => {
                        tracing::trace!(address = %log_address, "unchanged content skipped");
                    }
                    Ok(fp) => {
                        last = Some(fp);
                        callback(value);
                    }
                    Err(e) => {
                        tracing::warn!(address = %log_address, error = %e, "cannot fingerprint document");
                    }
                }
            }
            if rx.changed().await.is_err() {
                tracing::debug!(address = %log_address, "document handle closed");
                break;
            }
        }
    });

    Subscription { address, task }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryRepo;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn subscribe(handle: Arc<dyn DocHandle>) -> (Subscription, mpsc::UnboundedReceiver<Value>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sub = on_mutation(handle, move |value| {
            let _ = tx.send(value);
        });
        (sub, rx)
    }

    #[tokio::test]
    async fn test_delivers_current_value_immediately() {
        let repo = MemoryRepo::new();
        let handle = repo.insert("doc:a", serde_json::json!({ "n": 1 }));
        let (_sub, mut rx) = subscribe(handle);
        assert_eq!(rx.recv().await.unwrap()["n"], 1);
    }

    #[tokio::test]
    async fn test_delivers_changes_and_skips_duplicates() {
        let repo = MemoryRepo::new();
        let handle = repo.insert("doc:a", serde_json::json!({ "n": 1 }));
        let (_sub, mut rx) = subscribe(handle.clone());
        assert_eq!(rx.recv().await.unwrap()["n"], 1);

        // identical content
        handle.replace(serde_json::json!({ "n": 1 }));
        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.replace(serde_json::json!({ "n": 2 }));

        assert_eq!(rx.recv().await.unwrap()["n"], 2);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_waits_for_content() {
        let repo = MemoryRepo::new();
        let handle = repo.insert_syncing("doc:late");
        let (_sub, mut rx) = subscribe(handle.clone());
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(rx.try_recv().is_err());

        handle.replace(serde_json::json!({ "ready": true }));
        assert_eq!(rx.recv().await.unwrap()["ready"], true);
    }

    #[tokio::test]
    async fn test_cancel_stops_delivery() {
        let repo = MemoryRepo::new();
        let handle = repo.insert("doc:a", serde_json::json!({ "n": 1 }));
        let (sub, mut rx) = subscribe(handle.clone());
        assert_eq!(sub.address(), "doc:a");
        rx.recv().await.unwrap();

        sub.cancel();
        handle.replace(serde_json::json!({ "n": 2 }));
        // the sender lives in the aborted task, so the channel closes
        assert!(rx.recv().await.is_none());
    }
}
