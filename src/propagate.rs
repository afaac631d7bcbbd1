use async_channel::{bounded, Receiver, Sender, TrySendError};
use futures::future::BoxFuture;
use tracing::{debug, error, warn};
use tracing_futures::Instrument;

use crate::error::CacheResult;

/// A unit of background cache work
pub type CacheJob = BoxFuture<'static, CacheResult<()>>;

struct Task {
    op: &'static str,
    key: String,
    job: CacheJob,
}

async fn worker_main(id: usize, tasks: Receiver<Task>) {
    while let Ok(Task { op, key, job }) = tasks.recv().await {
        let span = tracing::debug_span!("cache_job", worker = id, op, key = %key);
        match job.instrument(span).await {
            Ok(()) => debug!(op, key = %key, "cache job done"),
            Err(e) => error!(op, key = %key, error = %e, "cache job failed"),
        }
    }
    debug!(worker = id, "cache worker stopped");
}

/// Bounded pool of tokio tasks running fire-and-forget cache jobs.
///
/// Submitting never waits. Jobs are neither retried nor cancelled, and the
/// workers stop once the propagator is dropped and the queue drained.
pub struct CachePropagator {
    tasks: Sender<Task>,
}

impl CachePropagator {
    /// Must be called from within a tokio runtime
    pub fn start(workers: usize, queue_capacity: usize) -> Self {
        let (tasks, rcv) = bounded(queue_capacity.max(1));
        for id in 0..workers.max(1) {
            tokio::spawn(worker_main(id, rcv.clone()));
        }
        Self { tasks }
    }

    /// Queue `job`. Returns `false` when it was dropped because the queue is
    /// full or closed.
    pub fn submit(&self, op: &'static str, key: impl Into<String>, job: CacheJob) -> bool {
        let key = key.into();
        match self.tasks.try_send(Task { op, key, job }) {
            Ok(()) => true,
            Err(TrySendError::Full(task)) => {
                warn!(op, key = %task.key, "cache queue full, dropping job");
                false
            }
            Err(TrySendError::Closed(task)) => {
                warn!(op, key = %task.key, "cache queue closed, dropping job");
                false
            }
        }
    }

    /// Jobs waiting for a worker
    pub fn pending(&self) -> usize {
        self.tasks.len()
    }
}
