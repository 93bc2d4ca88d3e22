use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;

/// Unbounded multi-producer FIFO of output chunks.
///
/// Clones share the same queue. There is no backpressure: producers never
/// block, so a chatty child grows the queue without limit. [`depth`] and
/// [`peak_depth`] make that growth observable.
///
/// [`depth`]: OutputQueue::depth
/// [`peak_depth`]: OutputQueue::peak_depth
#[derive(Debug, Clone, Default)]
pub struct OutputQueue {
    inner: Arc<Mutex<QueueState>>,
}

#[derive(Debug, Default)]
struct QueueState {
    chunks: VecDeque<Bytes>,
    peak: usize,
    enqueued_bytes: u64,
}

impl OutputQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk. Empty chunks are dropped.
    pub fn push(&self, chunk: Bytes) {
        if chunk.is_empty() {
            return;
        }
        let mut state = self.lock();
        state.enqueued_bytes = state.enqueued_bytes.saturating_add(chunk.len() as u64);
        state.chunks.push_back(chunk);
        state.peak = state.peak.max(state.chunks.len());
    }

    /// Remove the oldest chunk.
    pub fn pop(&self) -> Option<Bytes> {
        self.lock().chunks.pop_front()
    }

    /// Number of chunks waiting.
    pub fn depth(&self) -> usize {
        self.lock().chunks.len()
    }

    /// True if no chunk is waiting.
    pub fn is_empty(&self) -> bool {
        self.lock().chunks.is_empty()
    }

    /// Largest depth seen since creation.
    pub fn peak_depth(&self) -> usize {
        self.lock().peak
    }

    /// Total bytes ever enqueued.
    pub fn enqueued_bytes(&self) -> u64 {
        self.lock().enqueued_bytes
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
