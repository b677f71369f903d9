use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::post,
    Json, Router,
};
use derive_new::new;
use mixer_core::{JobOutcome, RelayResponse};
use tracing::{debug, error, info};

use crate::dispatcher::{DispatcherError, BUSY_MESSAGE};
use crate::metrics::RelayerMetrics;
use crate::queue::{QueueError, SubmissionQueue};
use crate::validator::{RelayRequestBody, RequestValidator};

const RELAY_API_BASE: &str = "/relay";

/// Admission of withdrawal requests
#[derive(new, Clone)]
pub struct ServerState {
    validator: RequestValidator,
    queue: SubmissionQueue,
    metrics: RelayerMetrics,
}

impl ServerState {
    /// `POST /relay`
    pub fn router(self) -> Router {
        Router::new()
            .route(RELAY_API_BASE, post(relay))
            .with_state(self)
    }

    fn reject(&self, reason: &str, outcome: JobOutcome) -> (StatusCode, Json<RelayResponse>) {
        self.metrics
            .requests_rejected
            .with_label_values(&[reason])
            .inc();
        into_response(outcome)
    }
}

/// Validate the body, queue the withdrawal and answer once its job reached a
/// terminal outcome. A body that is not a JSON object is treated as empty so
/// that it is refused with the usual reasons.
async fn relay(State(state): State<ServerState>, body: Bytes) -> (StatusCode, Json<RelayResponse>) {
    let body: RelayRequestBody = serde_json::from_slice(&body).unwrap_or_default();

    let request = match state.validator.validate(&body) {
        Ok(request) => request,
        Err(err) => {
            debug!(%err, "Refusing relay request");
            return state.reject("invalid_request", JobOutcome::rejected(err.to_string()));
        }
    };

    let (job_id, receiver) = match state.queue.enqueue(request).await {
        Ok(enqueued) => enqueued,
        Err(QueueError::Dispatcher(DispatcherError::Busy(capacity))) => {
            info!(capacity, "Refusing relay request, too many pending responses");
            return state.reject("busy", JobOutcome::rejected(BUSY_MESSAGE));
        }
        Err(err) => {
            error!(?err, "Failed to enqueue relay request");
            return state.reject("queue_error", JobOutcome::internal_error());
        }
    };

    match receiver.await {
        Ok(outcome) => into_response(outcome),
        Err(_) => {
            error!(%job_id, "Job finished without an outcome");
            into_response(JobOutcome::internal_error())
        }
    }
}

fn into_response(outcome: JobOutcome) -> (StatusCode, Json<RelayResponse>) {
    let status = StatusCode::from_u16(outcome.status).unwrap_or(StatusCode::BAD_REQUEST);
    (status, Json(outcome.response))
}
