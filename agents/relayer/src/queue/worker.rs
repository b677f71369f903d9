use std::collections::VecDeque;
use std::sync::Arc;

use mixer_core::{Job, JobOutcome, JobStatus};
use tokio::sync::mpsc;
use tracing::{error, info, info_span, Instrument};

use super::JobDb;
use crate::dispatcher::ResponseDispatcher;
use crate::metrics::RelayerMetrics;
use crate::submitter::TransactionSubmitter;

/// The single consumer of the submission queue. Each job runs to its
/// terminal outcome before the next one is dequeued.
pub struct SubmissionWorker {
    receiver: mpsc::UnboundedReceiver<Job>,
    recovered: VecDeque<Job>,
    db: Arc<dyn JobDb>,
    submitter: TransactionSubmitter,
    dispatcher: Arc<ResponseDispatcher>,
    metrics: RelayerMetrics,
}

impl SubmissionWorker {
    /// `recovered` holds jobs persisted by a previous run; they are processed
    /// before anything arriving on `receiver`.
    pub fn new(
        receiver: mpsc::UnboundedReceiver<Job>,
        recovered: Vec<Job>,
        db: Arc<dyn JobDb>,
        submitter: TransactionSubmitter,
        dispatcher: Arc<ResponseDispatcher>,
        metrics: RelayerMetrics,
    ) -> Self {
        if !recovered.is_empty() {
            info!(count = recovered.len(), "Recovered unfinished jobs");
        }
        metrics
            .queue_length
            .with_label_values(&[])
            .add(recovered.len() as i64);
        Self {
            receiver,
            recovered: recovered.into(),
            db,
            submitter,
            dispatcher,
            metrics,
        }
    }

    /// Drain the queue until every sender is gone
    pub async fn run(mut self) {
        while let Some(job) = self.next_job().await {
            let span = info_span!("job", job_id = %job.id);
            self.handle(job).instrument(span).await;
        }
        info!("Submission queue closed, worker exiting");
    }

    async fn next_job(&mut self) -> Option<Job> {
        if let Some(job) = self.recovered.pop_front() {
            return Some(job);
        }
        self.receiver.recv().await
    }

    async fn handle(&self, mut job: Job) {
        self.metrics.queue_length.with_label_values(&[]).dec();
        self.metrics.active_jobs.with_label_values(&[]).inc();

        job.status = JobStatus::Active;
        if let Err(err) = self.db.store_job(&job).await {
            error!(?err, "Failed to mark job active");
        }

        let outcome = self.submitter.process(&job.request).await;
        self.complete(&job, outcome).await;

        self.metrics.active_jobs.with_label_values(&[]).dec();
    }

    async fn complete(&self, job: &Job, outcome: JobOutcome) {
        if let Err(err) = self.db.remove_job(&job.id).await {
            error!(?err, "Failed to remove completed job");
        }
        self.metrics.record_outcome(&outcome);
        info!(status = outcome.status, tx_hash = ?outcome.tx_hash(), "Job completed");
        self.dispatcher.dispatch(job.id, outcome);
    }
}
