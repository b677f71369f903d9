use std::fmt::{Debug, Display, Formatter};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{WithdrawRequest, H256};

/// Message returned to callers whenever a job fails for a reason that must not
/// leak operational detail.
pub const INTERNAL_RELAYER_ERROR: &str =
    "Internal Relayer Error. Please use a different relayer service";

/// HTTP-equivalent status of a successful outcome
pub const STATUS_OK: u16 = 200;
/// HTTP-equivalent status of a rejected or failed outcome
pub const STATUS_BAD_REQUEST: u16 = 400;

/// Unique identifier assigned to a job when it is enqueued
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    /// Generate a fresh random identifier
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl AsRef<[u8]> for JobId {
    fn as_ref(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl Debug for JobId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "JobId({})", self.0)
    }
}

impl Display for JobId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a job is in its lifecycle. Completed jobs are removed from storage,
/// so there is no variant for them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    /// Enqueued and persisted, waiting for the worker
    #[default]
    Created,
    /// Dequeued by the worker and being processed
    Active,
}

/// A queued unit of work wrapping one withdrawal
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Identifier assigned at enqueue time
    pub id: JobId,
    /// The withdrawal to relay
    pub request: WithdrawRequest,
    /// Lifecycle state
    pub status: JobStatus,
}

impl Job {
    /// Wrap a request into a freshly created job
    pub fn new(request: WithdrawRequest) -> Self {
        Self {
            id: JobId::random(),
            request,
            status: JobStatus::Created,
        }
    }
}

/// Body returned to the caller
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RelayResponse {
    /// The transaction was accepted into the node's pending pool
    Submitted {
        /// Hash of the broadcast transaction
        #[serde(rename = "txHash")]
        tx_hash: H256,
    },
    /// The withdrawal was rejected or could not be relayed
    Failed {
        /// Caller-facing reason
        error: String,
    },
}

/// Terminal outcome of a job, delivered exactly once to the caller
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobOutcome {
    /// HTTP-equivalent status code
    pub status: u16,
    /// Response body
    pub response: RelayResponse,
}

impl JobOutcome {
    /// The transaction was acknowledged by the node
    pub fn submitted(tx_hash: H256) -> Self {
        Self {
            status: STATUS_OK,
            response: RelayResponse::Submitted { tx_hash },
        }
    }

    /// The withdrawal was rejected with a caller-facing reason
    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            status: STATUS_BAD_REQUEST,
            response: RelayResponse::Failed {
                error: error.into(),
            },
        }
    }

    /// The relayer failed internally
    pub fn internal_error() -> Self {
        Self::rejected(INTERNAL_RELAYER_ERROR)
    }

    /// Whether the transaction was broadcast
    pub fn is_success(&self) -> bool {
        matches!(self.response, RelayResponse::Submitted { .. })
    }

    /// Transaction hash, if one was broadcast
    pub fn tx_hash(&self) -> Option<H256> {
        match self.response {
            RelayResponse::Submitted { tx_hash } => Some(tx_hash),
            RelayResponse::Failed { .. } => None,
        }
    }
}
