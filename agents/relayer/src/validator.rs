use std::sync::Arc;

use derive_new::new;
use mixer_core::{utils::parse_u256, Address, Bytes, WithdrawArgs, WithdrawRequest, H256, U256};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::settings::MixerRegistry;

/// Length of a serialized groth16 withdrawal proof
pub const PROOF_LENGTH: usize = 256;

const ARGS_COUNT: usize = 6;

/// Body of a relay request, exactly as the caller sent it. Fields are kept
/// untyped so that every malformed shape is reported with the same reasons.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelayRequestBody {
    /// `0x` prefixed hex proof
    #[serde(default)]
    pub proof: Value,
    /// `[root, nullifierHash, recipient, relayer, fee, refund]`
    #[serde(default)]
    pub args: Value,
    /// Mixer contract address
    #[serde(default)]
    pub contract: Value,
}

/// Reason a relay request is refused at admission
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The proof is not a hex string of the expected length
    #[error("Proof format is invalid")]
    InvalidProof,
    /// The public arguments are missing, of the wrong count or malformed
    #[error("Withdraw arguments are invalid")]
    InvalidArgs,
    /// The contract is not a configured mixer
    #[error("This relayer does not support the token")]
    UnsupportedContract,
    /// A refund was requested from a native-asset mixer
    #[error("Cannot send refund for eth currency.")]
    RefundForNativeCurrency,
    /// The proof binds the fee to a different relayer account
    #[error("Relayer address is invalid")]
    InvalidRelayer,
}

/// Admission checks for relay requests. Stateless apart from configuration,
/// so it can be shared between request handlers.
#[derive(Debug, Clone, new)]
pub struct RequestValidator {
    mixers: Arc<MixerRegistry>,
    relayer: Address,
}

impl RequestValidator {
    /// Check `body` and extract the typed withdrawal. Checks run in a fixed
    /// order and stop at the first failure.
    pub fn validate(&self, body: &RelayRequestBody) -> Result<WithdrawRequest, ValidationError> {
        let proof = parse_proof(&body.proof).ok_or(ValidationError::InvalidProof)?;
        let args = parse_args(&body.args).ok_or(ValidationError::InvalidArgs)?;

        let contract = body
            .contract
            .as_str()
            .and_then(parse_address)
            .ok_or(ValidationError::UnsupportedContract)?;
        let mixer = self
            .mixers
            .lookup(&contract)
            .ok_or(ValidationError::UnsupportedContract)?;

        if mixer.currency.is_native() && !args.refund.is_zero() {
            return Err(ValidationError::RefundForNativeCurrency);
        }
        if args.relayer != self.relayer {
            debug!(relayer = ?args.relayer, "Proof is for a different relayer");
            return Err(ValidationError::InvalidRelayer);
        }

        Ok(WithdrawRequest {
            proof,
            args,
            contract,
            currency: mixer.currency.clone(),
            amount: mixer.amount.clone(),
            decimals: mixer.decimals,
        })
    }
}

/// `0x` followed by exactly `bytes * 2` hex digits
fn strict_hex(value: &str, bytes: usize) -> Option<Vec<u8>> {
    let digits = value.strip_prefix("0x")?;
    if digits.len() != bytes * 2 {
        return None;
    }
    hex::decode(digits).ok()
}

fn parse_proof(value: &Value) -> Option<Bytes> {
    strict_hex(value.as_str()?, PROOF_LENGTH).map(Bytes::from)
}

fn parse_bytes32(value: &str) -> Option<H256> {
    strict_hex(value, 32).map(|bytes| H256::from_slice(&bytes))
}

fn parse_address(value: &str) -> Option<Address> {
    strict_hex(value, 20).map(|bytes| Address::from_slice(&bytes))
}

fn parse_amount(value: &str) -> Option<U256> {
    parse_u256(value)
}

fn parse_args(value: &Value) -> Option<WithdrawArgs> {
    let args = value.as_array()?;
    if args.len() != ARGS_COUNT {
        return None;
    }
    let args = args
        .iter()
        .map(Value::as_str)
        .collect::<Option<Vec<_>>>()?;

    Some(WithdrawArgs {
        root: parse_bytes32(args[0])?,
        nullifier_hash: parse_bytes32(args[1])?,
        recipient: parse_address(args[2])?,
        relayer: parse_address(args[3])?,
        fee: parse_amount(args[4])?,
        refund: parse_amount(args[5])?,
    })
}
