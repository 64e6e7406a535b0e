//! Bounded worker pool for CPU-bound pipeline stages (§5)
//!
//! ASR inference, hiragana conversion, and translation are the CPU-bound
//! stages per session. They are dispatched through this semaphore-gated
//! pool rather than run unbounded: the spec recommends capping concurrent
//! model invocations at two to protect memory, and a not-thread-safe model
//! instance can be serialized entirely by sizing the pool at one permit.
//! Grounded in the corpus's `tokio::task::spawn_blocking` usage for
//! whisper inference (`subwin-backend/src/services/transcription_service.rs`)
//! combined with a `Semaphore` for bounding concurrency, the same shape
//! `arach-scout`'s webhook dispatcher and `remotemedia-sdk`'s scheduler use
//! to cap fan-out.

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Process-wide gate on concurrent CPU-bound pipeline stages.
#[derive(Clone)]
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
}

impl WorkerPool {
    pub fn new(permits: usize) -> Self {
        Self { semaphore: Arc::new(Semaphore::new(permits.max(1))) }
    }

    /// Acquire a permit, suspending until one is free. Held across the
    /// caller's await of the gated stage; dropping it releases the slot.
    pub async fn acquire(&self) -> OwnedSemaphorePermit {
        self.semaphore.clone().acquire_owned().await.expect("worker pool semaphore is never closed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_acquire_waits_for_the_first_permit_to_drop() {
        let pool = WorkerPool::new(1);
        let permit = pool.acquire().await;

        let pool2 = pool.clone();
        let handle = tokio::spawn(async move {
            let _permit2 = pool2.acquire().await;
        });

        // Give the spawned task a chance to run; it must not complete yet.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!handle.is_finished());

        drop(permit);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn independent_permits_do_not_block_each_other() {
        let pool = WorkerPool::new(2);
        let _a = pool.acquire().await;
        let b = tokio::time::timeout(std::time::Duration::from_millis(50), pool.acquire()).await;
        assert!(b.is_ok());
    }
}
