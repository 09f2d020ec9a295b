use std::sync::Arc;

use tokio::sync::Mutex;

use crate::collector::PollBatch;

/// Accumulates poll batches between report ticks.
///
/// The lock is held only to push or to take the whole vector, never while
/// a batch is being sent.
#[derive(Clone, Default)]
pub struct BatchBuffer {
    batches: Arc<Mutex<Vec<PollBatch>>>,
}

impl BatchBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push(&self, batch: PollBatch) {
        self.batches.lock().await.push(batch);
    }

    /// Take every buffered batch in arrival order, leaving the buffer empty.
    pub async fn swap(&self) -> Vec<PollBatch> {
        std::mem::take(&mut *self.batches.lock().await)
    }

    pub async fn len(&self) -> usize {
        self.batches.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.batches.lock().await.is_empty()
    }
}
