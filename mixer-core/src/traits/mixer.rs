use async_trait::async_trait;
use auto_impl::auto_impl;

use crate::{Address, Bytes, ChainResult, RelayTransaction, WithdrawRequest, H256, U256};

/// Interface to the chain the mixer contracts live on, bound to the relayer
/// account that signs and pays for withdrawals.
#[async_trait]
#[auto_impl(&, Box, Arc)]
pub trait MixerChain: Send + Sync {
    /// The account transactions are signed with
    fn relayer_address(&self) -> Address;

    /// Whether the note behind `nullifier_hash` was already withdrawn
    async fn is_spent(&self, contract: Address, nullifier_hash: H256) -> ChainResult<bool>;

    /// Whether `root` is in the contract's recent root history
    async fn is_known_root(&self, contract: Address, root: H256) -> ChainResult<bool>;

    /// Estimate the gas the relayer account needs to execute the withdrawal
    async fn estimate_withdraw_gas(&self, request: &WithdrawRequest) -> ChainResult<U256>;

    /// ABI-encode the `withdraw` call for `request`
    fn encode_withdraw(&self, request: &WithdrawRequest) -> ChainResult<Bytes>;

    /// Number of transactions sent from the relayer account, including the
    /// ones still pending
    async fn pending_transaction_count(&self) -> ChainResult<U256>;

    /// Sign `tx` with the relayer key and broadcast it. Resolves once the node
    /// acknowledged the transaction into its pending pool.
    async fn sign_and_send(&self, tx: &RelayTransaction) -> ChainResult<H256>;
}
