//! Per-job state machine that turns a queued withdrawal into a broadcast
//! transaction.
//!
//! Stages run in a fixed order and the first rejection or failure ends the
//! job. Business rejections (spent note, stale root, insufficient fee) leave
//! the nonce counter untouched; the nonce is reserved only once the
//! transaction is about to be built.

use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Instant;

use mixer_core::{
    ChainCommunicationError, JobOutcome, MixerChain, PriceFeed, RelayTransaction,
    WithdrawRequest, U256,
};
use tracing::{debug, error, info, instrument, warn};

use crate::fee::{is_enough_fee, FeeCheck, FeeVerdict};
use crate::metrics::RelayerMetrics;
use crate::nonce::{NonceCoordinator, NonceError};

/// Safety margin added on top of every gas estimate
pub const GAS_ESTIMATE_BUFFER: u32 = 50_000;

/// How many times a broadcast is retried with a fresh nonce after the node
/// reported a nonce conflict
pub const MAX_NONCE_RETRIES: u32 = 10;

/// Returned when the note was already withdrawn
pub const NOTE_SPENT_MESSAGE: &str = "The note has been spent.";

/// Returned when the proof's root is not in the contract's root history
pub const UNKNOWN_ROOT_MESSAGE: &str = "The merkle root is too old or invalid.";

/// Add the safety margin to a gas estimate
pub fn apply_gas_estimate_buffer(gas: U256) -> U256 {
    gas.saturating_add(GAS_ESTIMATE_BUFFER.into())
}

/// Stages of a submission, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionStage {
    /// Ask the contract whether the nullifier was used
    CheckSpent,
    /// Ask the contract whether the root is known
    CheckRoot,
    /// Estimate the withdrawal's gas
    EstimateGas,
    /// Decide whether the fee pays for the withdrawal
    FeeCheck,
    /// Reserve a nonce and assemble the transaction
    BuildTx,
    /// Sign and broadcast
    SignAndSend,
}

impl Display for SubmissionStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::CheckSpent => "check_spent",
            Self::CheckRoot => "check_root",
            Self::EstimateGas => "estimate_gas",
            Self::FeeCheck => "fee_check",
            Self::BuildTx => "build_tx",
            Self::SignAndSend => "sign_and_send",
        };
        f.write_str(name)
    }
}

/// Failures that end a job with the generic relayer error
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    /// A chain call failed
    #[error("{stage} failed: {source}")]
    Chain {
        /// Stage that issued the call
        stage: SubmissionStage,
        /// Underlying error
        source: ChainCommunicationError,
    },
    /// The nonce counter could not be read or advanced
    #[error(transparent)]
    Nonce(#[from] NonceError),
    /// Every retry ran into a nonce conflict
    #[error("Broadcast still conflicting after {retries} nonce retries: {source}")]
    RetriesExhausted {
        /// Retries attempted
        retries: u32,
        /// Last conflict reported by the node
        source: ChainCommunicationError,
    },
    /// The price snapshot lost its gas price between fee check and build
    #[error("No usable gas price")]
    MissingGasPrice,
}

impl SubmissionError {
    fn chain(stage: SubmissionStage) -> impl FnOnce(ChainCommunicationError) -> Self {
        move |source| Self::Chain { stage, source }
    }
}

/// Runs the submission state machine for one job at a time
pub struct TransactionSubmitter {
    chain: Arc<dyn MixerChain>,
    prices: Arc<dyn PriceFeed>,
    nonces: Arc<NonceCoordinator>,
    chain_id: u64,
    service_fee_percent: f64,
    metrics: RelayerMetrics,
}

impl TransactionSubmitter {
    /// Create a submitter broadcasting on chain `chain_id`
    pub fn new(
        chain: Arc<dyn MixerChain>,
        prices: Arc<dyn PriceFeed>,
        nonces: Arc<NonceCoordinator>,
        chain_id: u64,
        service_fee_percent: f64,
        metrics: RelayerMetrics,
    ) -> Self {
        Self {
            chain,
            prices,
            nonces,
            chain_id,
            service_fee_percent,
            metrics,
        }
    }

    /// Process `request` to a terminal outcome. Never fails: every error is
    /// logged and turned into the generic relayer error.
    #[instrument(skip_all, fields(contract = ?request.contract, nullifier_hash = ?request.nullifier_hash()))]
    pub async fn process(&self, request: &WithdrawRequest) -> JobOutcome {
        let started = Instant::now();
        let outcome = match self.submit(request).await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(?err, "Withdrawal failed");
                JobOutcome::internal_error()
            }
        };
        self.metrics
            .submission_duration
            .with_label_values(&[])
            .observe(started.elapsed().as_secs_f64());
        outcome
    }

    async fn submit(&self, request: &WithdrawRequest) -> Result<JobOutcome, SubmissionError> {
        let spent = self
            .chain
            .is_spent(request.contract, request.nullifier_hash())
            .await
            .map_err(SubmissionError::chain(SubmissionStage::CheckSpent))?;
        if spent {
            info!("Note already spent");
            return Ok(JobOutcome::rejected(NOTE_SPENT_MESSAGE));
        }

        let known_root = self
            .chain
            .is_known_root(request.contract, request.root())
            .await
            .map_err(SubmissionError::chain(SubmissionStage::CheckRoot))?;
        if !known_root {
            info!(root = ?request.root(), "Unknown merkle root");
            return Ok(JobOutcome::rejected(UNKNOWN_ROOT_MESSAGE));
        }

        let estimate = self
            .chain
            .estimate_withdraw_gas(request)
            .await
            .map_err(SubmissionError::chain(SubmissionStage::EstimateGas))?;
        let gas = apply_gas_estimate_buffer(estimate);
        debug!(?estimate, ?gas, "Estimated withdrawal gas");

        let prices = self.prices.snapshot();
        let verdict = is_enough_fee(&FeeCheck {
            gas,
            prices: &prices,
            currency: &request.currency,
            amount: &request.amount,
            decimals: request.decimals,
            refund: request.args.refund,
            fee: request.args.fee,
            service_fee_percent: self.service_fee_percent,
        });
        match verdict {
            FeeVerdict::Sufficient { desired_fee } => {
                debug!(fee = ?request.args.fee, ?desired_fee, "Fee is sufficient");
            }
            FeeVerdict::Insufficient(shortfall) => {
                info!(fee = ?request.args.fee, %shortfall, "Fee refused");
                return Ok(JobOutcome::rejected(shortfall.to_string()));
            }
        }

        let gas_price = prices
            .gas_prices
            .fast_wei()
            .ok_or(SubmissionError::MissingGasPrice)?;
        let data = self
            .chain
            .encode_withdraw(request)
            .map_err(SubmissionError::chain(SubmissionStage::BuildTx))?;
        let nonce = self.nonces.reserve().await?;
        self.metrics.set_next_nonce(nonce.saturating_add(U256::one()));

        let tx = RelayTransaction {
            from: self.nonces.address(),
            to: request.contract,
            value: request.args.refund,
            gas,
            gas_price,
            data,
            nonce,
            chain_id: self.chain_id,
        };
        self.sign_and_send(tx).await
    }

    #[instrument(skip_all, fields(nonce = ?tx.nonce))]
    async fn sign_and_send(
        &self,
        mut tx: RelayTransaction,
    ) -> Result<JobOutcome, SubmissionError> {
        let mut retries = 0;
        loop {
            match self.chain.sign_and_send(&tx).await {
                Ok(tx_hash) => {
                    info!(?tx_hash, nonce = ?tx.nonce, retries, "Withdrawal broadcast");
                    return Ok(JobOutcome::submitted(tx_hash));
                }
                Err(err) if err.is_nonce_conflict() && retries < MAX_NONCE_RETRIES => {
                    retries += 1;
                    warn!(?err, nonce = ?tx.nonce, retries, "Nonce conflict, retrying with next nonce");
                    self.metrics
                        .nonce_conflict_retries
                        .with_label_values(&[])
                        .inc();
                    tx.nonce = self.nonces.skip_conflicting(tx.nonce).await?;
                    self.metrics
                        .set_next_nonce(tx.nonce.saturating_add(U256::one()));
                }
                Err(source) if source.is_nonce_conflict() => {
                    return Err(SubmissionError::RetriesExhausted { retries, source });
                }
                Err(source) => {
                    return Err(SubmissionError::Chain {
                        stage: SubmissionStage::SignAndSend,
                        source,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_is_added_to_estimates() {
        assert_eq!(
            apply_gas_estimate_buffer(U256::from(210_000)),
            U256::from(260_000)
        );
        assert_eq!(apply_gas_estimate_buffer(U256::MAX), U256::MAX);
    }

    #[test]
    fn errors_name_their_stage() {
        let err = SubmissionError::Chain {
            stage: SubmissionStage::EstimateGas,
            source: ChainCommunicationError::ContractError("execution reverted".into()),
        };
        assert_eq!(
            err.to_string(),
            "estimate_gas failed: Contract error: execution reverted"
        );
    }
}
