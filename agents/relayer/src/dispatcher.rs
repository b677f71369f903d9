use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use mixer_core::{JobId, JobOutcome};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::metrics::RelayerMetrics;

/// Message returned when too many callers are already waiting
pub const BUSY_MESSAGE: &str = "Relayer is busy. Please try again later";

/// Errors of the response dispatcher
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatcherError {
    /// The pending-response table is full
    #[error("Too many pending responses ({0})")]
    Busy(usize),
    /// A caller is already waiting on this job
    #[error("Job {0} already has a pending response")]
    AlreadyRegistered(JobId),
}

/// Routes each job outcome to the caller that submitted the job. Every job has
/// at most one waiting caller and every caller receives exactly one outcome.
#[derive(Debug)]
pub struct ResponseDispatcher {
    pending: Mutex<HashMap<JobId, oneshot::Sender<JobOutcome>>>,
    capacity: usize,
    metrics: RelayerMetrics,
}

impl ResponseDispatcher {
    /// Dispatcher holding at most `capacity` waiting callers
    pub fn new(capacity: usize, metrics: RelayerMetrics) -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            capacity,
            metrics,
        }
    }

    /// Register a caller waiting for the outcome of `id`
    pub fn register(&self, id: JobId) -> Result<oneshot::Receiver<JobOutcome>, DispatcherError> {
        let mut pending = self.lock();
        if pending.contains_key(&id) {
            return Err(DispatcherError::AlreadyRegistered(id));
        }
        if pending.len() >= self.capacity {
            warn!(capacity = self.capacity, "Pending response table is full");
            return Err(DispatcherError::Busy(self.capacity));
        }
        let (sender, receiver) = oneshot::channel();
        pending.insert(id, sender);
        self.update_gauge(pending.len());
        Ok(receiver)
    }

    /// Deliver `outcome` to the caller of `id` and forget the caller. Returns
    /// whether a caller received it; outcomes without a caller are dropped.
    pub fn dispatch(&self, id: JobId, outcome: JobOutcome) -> bool {
        let sender = {
            let mut pending = self.lock();
            let sender = pending.remove(&id);
            self.update_gauge(pending.len());
            sender
        };
        let Some(sender) = sender else {
            debug!(job_id = %id, ?outcome, "No caller waiting for job, dropping outcome");
            return false;
        };
        match sender.send(outcome) {
            Ok(()) => true,
            Err(outcome) => {
                debug!(job_id = %id, ?outcome, "Caller went away before the outcome was ready");
                false
            }
        }
    }

    /// Forget the caller of `id` without delivering anything
    pub fn discard(&self, id: &JobId) {
        let mut pending = self.lock();
        pending.remove(id);
        self.update_gauge(pending.len());
    }

    /// Number of callers currently waiting
    pub fn pending_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<JobId, oneshot::Sender<JobOutcome>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update_gauge(&self, len: usize) {
        self.metrics
            .pending_responses
            .with_label_values(&[])
            .set(len as i64);
    }
}
