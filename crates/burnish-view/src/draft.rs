use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use burnish_store::{SharedStore, SharedStoreExt, StoreError};
use tokio::task::JoinHandle;
use tracing::warn;

/// Debounced persistence of unsent input text, independent of the job
/// lifecycle. Each edit supersedes any pending write; only a quiet period
/// with no further edits reaches the store. The coordinator clears the
/// draft on successful completion; failed and cancelled jobs leave it
/// intact so the user never loses input to an error.
pub struct DraftManager {
    store: Arc<dyn SharedStore>,
    quiet_period: Duration,
    pending: StdMutex<Option<JoinHandle<()>>>,
}

impl DraftManager {
    pub fn new(store: Arc<dyn SharedStore>, quiet_period: Duration) -> Self {
        Self {
            store,
            quiet_period,
            pending: StdMutex::new(None),
        }
    }

    pub fn load(&self) -> Result<Option<String>, StoreError> {
        self.store.draft()
    }

    pub fn note_edit(&self, text: String) {
        let store = Arc::clone(&self.store);
        let quiet_period = self.quiet_period;
        let mut pending = self.pending.lock().expect("draft debounce lock poisoned");
        if let Some(superseded) = pending.take() {
            superseded.abort();
        }
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(quiet_period).await;
            if let Err(error) = store.put_draft(text) {
                warn!(%error, "failed to persist draft");
            }
        }));
    }

    /// Drops any pending write. An edit younger than the quiet period is
    /// lost on teardown, same as the interface closing mid-debounce.
    pub fn close(&self) {
        if let Some(pending) = self
            .pending
            .lock()
            .expect("draft debounce lock poisoned")
            .take()
        {
            pending.abort();
        }
    }
}

impl Drop for DraftManager {
    fn drop(&mut self) {
        self.close();
    }
}
