use std::sync::Arc;

use mixer_base::db::DbError;
use mixer_core::{Job, JobId, JobOutcome, WithdrawRequest};
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, error, instrument};

use crate::dispatcher::{DispatcherError, ResponseDispatcher};
use crate::metrics::RelayerMetrics;

pub use db::JobDb;
pub use worker::SubmissionWorker;

mod db;
mod worker;

/// Errors of the submission queue
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// The caller could not be registered for the outcome
    #[error(transparent)]
    Dispatcher(#[from] DispatcherError),
    /// The job could not be persisted
    #[error("Failed to persist job: {0}")]
    DbError(#[from] DbError),
    /// The submission worker is no longer running
    #[error("Submission worker stopped")]
    WorkerStopped,
}

/// Hands jobs to the single submission worker. Jobs are persisted before they
/// are queued and processed strictly in enqueue order. Cloning is cheap.
#[derive(Clone)]
pub struct SubmissionQueue {
    db: Arc<dyn JobDb>,
    sender: mpsc::UnboundedSender<Job>,
    /// Held while a job is assigned its index and sent, so that persisted
    /// order and channel order agree
    enqueue_lock: Arc<Mutex<()>>,
    dispatcher: Arc<ResponseDispatcher>,
    metrics: RelayerMetrics,
}

impl SubmissionQueue {
    /// Create the queue along with the receiving end the worker drains
    pub fn new(
        db: Arc<dyn JobDb>,
        dispatcher: Arc<ResponseDispatcher>,
        metrics: RelayerMetrics,
    ) -> (Self, mpsc::UnboundedReceiver<Job>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let queue = Self {
            db,
            sender,
            enqueue_lock: Arc::new(Mutex::new(())),
            dispatcher,
            metrics,
        };
        (queue, receiver)
    }

    /// Persist a job for `request` and queue it. The returned receiver
    /// resolves with the job's outcome.
    #[instrument(skip_all, fields(contract = ?request.contract, nullifier_hash = ?request.nullifier_hash()))]
    pub async fn enqueue(
        &self,
        request: WithdrawRequest,
    ) -> Result<(JobId, oneshot::Receiver<JobOutcome>), QueueError> {
        let job = Job::new(request);
        let id = job.id;
        let receiver = self.dispatcher.register(id)?;

        let _guard = self.enqueue_lock.lock().await;
        if let Err(err) = self.db.store_job(&job).await {
            error!(job_id = %id, ?err, "Failed to persist job");
            self.dispatcher.discard(&id);
            return Err(err.into());
        }

        let queue_length = self.metrics.queue_length.with_label_values(&[]);
        queue_length.inc();
        if self.sender.send(job).is_err() {
            error!(job_id = %id, "Submission worker is gone, job stays persisted for the next start");
            queue_length.dec();
            self.dispatcher.discard(&id);
            return Err(QueueError::WorkerStopped);
        }

        self.metrics.jobs_enqueued.with_label_values(&[]).inc();
        debug!(job_id = %id, "Job enqueued");
        Ok((id, receiver))
    }
}

#[cfg(test)]
mod tests {
    use mixer_base::db::{test_utils::tmp_db, RelayerRocksDB};

    use super::*;
    use crate::tests::test_utils::dummy_request;

    fn queue(
        capacity: usize,
    ) -> (
        tempfile::TempDir,
        Arc<RelayerRocksDB>,
        SubmissionQueue,
        mpsc::UnboundedReceiver<Job>,
    ) {
        let (dir, db) = tmp_db();
        let db = Arc::new(RelayerRocksDB::new(1, db));
        let metrics = RelayerMetrics::dummy_instance();
        let dispatcher = Arc::new(ResponseDispatcher::new(capacity, metrics.clone()));
        let (queue, receiver) = SubmissionQueue::new(db.clone(), dispatcher, metrics);
        (dir, db, queue, receiver)
    }

    #[tokio::test]
    async fn enqueued_jobs_are_persisted_and_ordered() {
        let (_dir, db, queue, mut receiver) = queue(8);

        let mut ids = Vec::new();
        for _ in 0..3 {
            let (id, _rx) = queue.enqueue(dummy_request()).await.unwrap();
            ids.push(id);
        }

        let persisted: Vec<JobId> = db
            .retrieve_pending_jobs()
            .await
            .unwrap()
            .into_iter()
            .map(|job| job.id)
            .collect();
        assert_eq!(persisted, ids);

        for id in ids {
            assert_eq!(receiver.recv().await.unwrap().id, id);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_enqueues_are_all_persisted_in_channel_order() {
        const JOBS: usize = 64;
        let (_dir, db, queue, mut receiver) = queue(JOBS);

        let handles: Vec<_> = (0..JOBS)
            .map(|_| {
                let queue = queue.clone();
                tokio::spawn(async move { queue.enqueue(dummy_request()).await.unwrap().0 })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        let mut sent = Vec::with_capacity(JOBS);
        for _ in 0..JOBS {
            sent.push(receiver.recv().await.unwrap().id);
        }
        let persisted: Vec<JobId> = db
            .retrieve_pending_jobs()
            .await
            .unwrap()
            .into_iter()
            .map(|job| job.id)
            .collect();
        assert_eq!(persisted, sent);
        assert_eq!(db.retrieve_highest_job_index().await.unwrap(), JOBS as u32);
        assert_eq!(queue.metrics.queue_length.with_label_values(&[]).get(), JOBS as i64);
    }

    #[tokio::test]
    async fn busy_dispatcher_rejects_before_persisting() {
        let (_dir, db, queue, _receiver) = queue(1);
        let _first = queue.enqueue(dummy_request()).await.unwrap();

        let err = queue.enqueue(dummy_request()).await.unwrap_err();
        assert!(matches!(
            err,
            QueueError::Dispatcher(DispatcherError::Busy(1))
        ));
        assert_eq!(db.retrieve_pending_jobs().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn stopped_worker_is_reported() {
        let (_dir, _db, queue, receiver) = queue(8);
        drop(receiver);
        assert!(matches!(
            queue.enqueue(dummy_request()).await.unwrap_err(),
            QueueError::WorkerStopped
        ));
        assert_eq!(queue.dispatcher.pending_count(), 0);
        assert_eq!(queue.metrics.queue_length.with_label_values(&[]).get(), 0);
    }
}
