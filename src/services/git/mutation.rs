//! Mutation Queue
//!
//! Single-lane FIFO serializing all repository-mutating operations. The
//! underlying repository has no internal locking for concurrent index/HEAD
//! mutation, so this queue is the only concurrency guard for writes:
//! operations run strictly one at a time in submission order, and a failing
//! operation does not block the ones behind it.

use std::future::Future;
use std::pin::Pin;

use tokio::sync::{mpsc, oneshot};

use crate::utils::error::{AppError, AppResult};

type QueuedOp = Box<dyn FnOnce() -> Pin<Box<dyn Future<Output = ()> + Send>> + Send>;

/// Single-lane mutation queue with a dedicated worker task.
pub struct MutationQueue {
    tx: mpsc::UnboundedSender<QueuedOp>,
}

impl Default for MutationQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl MutationQueue {
    /// Create the queue and spawn its worker.
    pub fn new() -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<QueuedOp>();
        tokio::spawn(async move {
            while let Some(op) = rx.recv().await {
                op().await;
            }
        });
        Self { tx }
    }

    /// Enqueue a mutating operation and await its result.
    ///
    /// Operations execute in submission order; the caller's future resolves
    /// once the worker has run the operation.
    pub async fn enqueue<T, F, Fut>(&self, op: F) -> AppResult<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = AppResult<T>> + Send,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let queued: QueuedOp = Box::new(move || {
            Box::pin(async move {
                // Receiver may have gone away; the op already ran either way
                let _ = reply_tx.send(op().await);
            })
        });
        self.tx
            .send(queued)
            .map_err(|_| AppError::internal("mutation queue worker stopped"))?;
        reply_rx
            .await
            .map_err(|_| AppError::internal("mutation queue dropped operation"))?
    }
}
