use crate::{Address, Bytes, U256};

/// A legacy transaction built for a single job. Never persisted; it lives
/// only between building and broadcast.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelayTransaction {
    /// Relayer account
    pub from: Address,
    /// Mixer contract
    pub to: Address,
    /// Native value attached, equal to the withdrawal refund
    pub value: U256,
    /// Gas limit
    pub gas: U256,
    /// Gas price in wei
    pub gas_price: U256,
    /// ABI-encoded `withdraw` call
    pub data: Bytes,
    /// Relayer account nonce
    pub nonce: U256,
    /// EIP-155 chain id
    pub chain_id: u64,
}
