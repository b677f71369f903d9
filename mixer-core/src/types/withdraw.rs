use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::{Address, Bytes, H256, U256};

/// Symbol of the chain's native asset.
pub const NATIVE_CURRENCY: &str = "eth";

/// Lowercase symbol of the asset a mixer contract holds.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Currency(String);

impl Currency {
    /// Create a currency from a symbol, normalizing case
    pub fn new(symbol: impl AsRef<str>) -> Self {
        Self(symbol.as_ref().to_ascii_lowercase())
    }

    /// The chain's native asset
    pub fn native() -> Self {
        Self(NATIVE_CURRENCY.to_owned())
    }

    /// Whether this is the chain's native asset
    pub fn is_native(&self) -> bool {
        self.0 == NATIVE_CURRENCY
    }

    /// The symbol as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Currency {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Public inputs of a withdrawal proof, in the order the mixer's `withdraw`
/// function takes them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawArgs {
    /// Merkle root the proof was generated against
    pub root: H256,
    /// Nullifier hash of the note being withdrawn
    pub nullifier_hash: H256,
    /// Account receiving the withdrawn funds
    pub recipient: Address,
    /// Relayer account the proof binds the fee to
    pub relayer: Address,
    /// Fee paid to the relayer, in the currency's base units
    pub fee: U256,
    /// Native-asset amount the relayer fronts to the recipient
    pub refund: U256,
}

/// A withdrawal that passed admission checks, along with the mixer instance
/// it targets.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawRequest {
    /// Opaque zk proof bytes
    pub proof: Bytes,
    /// Public inputs of the proof
    pub args: WithdrawArgs,
    /// Mixer contract the withdrawal is sent to
    pub contract: Address,
    /// Asset held by the mixer contract
    pub currency: Currency,
    /// Denomination of the mixer instance, e.g. `"0.1"`
    pub amount: String,
    /// Decimals of `currency`
    pub decimals: u32,
}

impl WithdrawRequest {
    /// Nullifier hash of the note being withdrawn
    pub fn nullifier_hash(&self) -> H256 {
        self.args.nullifier_hash
    }

    /// Merkle root the proof was generated against
    pub fn root(&self) -> H256 {
        self.args.root
    }
}
