use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use eyre::Result;
use mixer_base::CoreMetrics;
use mixer_core::{JobOutcome, U256};
use prometheus::{HistogramVec, IntCounterVec, IntGaugeVec};

const SUBMISSION_DURATION_BUCKETS: &[f64] = &[0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0];

/// Metrics of the relay pipeline
#[derive(Clone)]
pub struct RelayerMetrics {
    core: Arc<CoreMetrics>,

    /// Jobs accepted into the queue
    pub jobs_enqueued: IntCounterVec,
    /// Requests refused before reaching the queue, by reason
    pub requests_rejected: IntCounterVec,
    /// Completed jobs, by outcome status code
    pub job_outcomes: IntCounterVec,
    /// Jobs waiting for the worker
    pub queue_length: IntGaugeVec,
    /// Jobs being processed, at most one
    pub active_jobs: IntGaugeVec,
    /// Callers waiting for an outcome
    pub pending_responses: IntGaugeVec,
    /// Broadcasts retried after a nonce conflict
    pub nonce_conflict_retries: IntCounterVec,
    /// Next nonce of the relayer account
    pub next_nonce: IntGaugeVec,
    /// Time from dequeue to outcome
    pub submission_duration: HistogramVec,
}

impl RelayerMetrics {
    /// Register the relay metrics with the agent's registry
    pub fn new(core: Arc<CoreMetrics>) -> Result<Self> {
        Ok(Self {
            jobs_enqueued: core.new_int_counter(
                "jobs_enqueued",
                "Number of withdrawal jobs accepted into the submission queue",
                &[],
            )?,
            requests_rejected: core.new_int_counter(
                "requests_rejected",
                "Number of relay requests refused before reaching the submission queue",
                &["reason"],
            )?,
            job_outcomes: core.new_int_counter(
                "job_outcomes",
                "Number of completed withdrawal jobs",
                &["status"],
            )?,
            queue_length: core.new_int_gauge(
                "submission_queue_length",
                "Number of jobs waiting for the submission worker",
                &[],
            )?,
            active_jobs: core.new_int_gauge(
                "active_jobs",
                "Number of jobs being processed by the submission worker",
                &[],
            )?,
            pending_responses: core.new_int_gauge(
                "pending_responses",
                "Number of callers waiting for the outcome of their job",
                &[],
            )?,
            nonce_conflict_retries: core.new_int_counter(
                "nonce_conflict_retries",
                "Number of broadcasts retried with a higher nonce",
                &[],
            )?,
            next_nonce: core.new_int_gauge(
                "next_nonce",
                "Next nonce the relayer account will use",
                &[],
            )?,
            submission_duration: core.new_histogram(
                "submission_duration_seconds",
                "Time the submission worker spent on a job",
                &[],
                SUBMISSION_DURATION_BUCKETS.to_vec(),
            )?,
            core,
        })
    }

    /// Metrics registered with a throwaway registry
    #[cfg(test)]
    pub fn dummy_instance() -> Self {
        let core = CoreMetrics::new("relayer_test", prometheus::Registry::new()).unwrap();
        Self::new(Arc::new(core)).unwrap()
    }

    /// Encoded report of every metric of the agent
    pub fn gather(&self) -> prometheus::Result<Vec<u8>> {
        self.core.gather()
    }

    pub(crate) fn record_outcome(&self, outcome: &JobOutcome) {
        self.job_outcomes
            .with_label_values(&[&outcome.status.to_string()])
            .inc();
    }

    pub(crate) fn set_next_nonce(&self, nonce: U256) {
        let value = if nonce > U256::from(i64::MAX) {
            i64::MAX
        } else {
            nonce.as_u64() as i64
        };
        self.next_nonce.with_label_values(&[]).set(value);
    }
}

impl Debug for RelayerMetrics {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "RelayerMetrics {{ agent_name: {} }}", self.core.agent_name())
    }
}
