// src/store.rs

use crate::types::{FrameSummary, LatestResult};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Single shared "latest result" snapshot: written once per processed
/// frame by the acquisition task, read by any number of concurrent
/// consumers. The guard is scoped to the copy itself, so no blocking work
/// (inference, decode, network sends) ever runs while it is held.
#[derive(Clone)]
pub struct ResultStore {
    inner: Arc<Mutex<LatestResult>>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(LatestResult::default())),
        }
    }

    /// Replace the entire snapshot. Readers never observe a mix of old and
    /// new fields.
    pub async fn write(&self, summary: FrameSummary) {
        let mut guard = self.inner.lock().await;
        *guard = LatestResult::from(summary);
    }

    /// Clone the current snapshot.
    pub async fn read(&self) -> LatestResult {
        self.inner.lock().await.clone()
    }
}

impl Default for ResultStore {
    fn default() -> Self {
        Self::new()
    }
}
