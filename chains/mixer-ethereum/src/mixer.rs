use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use ethers::{
    abi::AbiEncode,
    providers::{Http, Middleware, Provider},
    signers::{LocalWallet, Signer},
    types::{transaction::eip2718::TypedTransaction, BlockNumber, TransactionRequest},
};
use mixer_core::{
    Address, Bytes, ChainCommunicationError, ChainResult, MixerChain, RelayTransaction,
    WithdrawRequest, H256, U256,
};
use tracing::{debug, info, instrument};

use crate::{
    classify_broadcast_error,
    interfaces::{Mixer, WithdrawCall},
    ConnectionConf,
};

/// ABI-encode a `withdraw` call, selector included.
pub fn encode_withdraw_call(request: &WithdrawRequest) -> Bytes {
    withdraw_call(request).encode().into()
}

fn withdraw_call(request: &WithdrawRequest) -> WithdrawCall {
    let args = &request.args;
    WithdrawCall {
        proof: request.proof.clone(),
        root: args.root.to_fixed_bytes(),
        nullifier_hash: args.nullifier_hash.to_fixed_bytes(),
        recipient: args.recipient,
        relayer: args.relayer,
        fee: args.fee,
        refund: args.refund,
    }
}

/// A mixer client on an ethereum chain, signing with a local relayer key
#[derive(Debug, Clone)]
pub struct EthereumMixerClient {
    provider: Arc<Provider<Http>>,
    wallet: LocalWallet,
}

impl EthereumMixerClient {
    /// Connect to the node at `conf.url`, signing with `private_key`
    pub fn new(conf: &ConnectionConf, private_key: &str) -> ChainResult<Self> {
        let provider = Provider::<Http>::try_from(conf.url.as_str()).map_err(|e| {
            ChainCommunicationError::CustomError(format!("Invalid rpc url {}: {e}", conf.url))
        })?;
        let wallet = LocalWallet::from_str(private_key.trim_start_matches("0x"))
            .map_err(|e| ChainCommunicationError::SigningError(e.to_string()))?
            .with_chain_id(conf.chain_id);
        Ok(Self {
            provider: Arc::new(provider),
            wallet,
        })
    }

    fn mixer(&self, contract: Address) -> Mixer<Provider<Http>> {
        Mixer::new(contract, self.provider.clone())
    }
}

#[async_trait]
impl MixerChain for EthereumMixerClient {
    fn relayer_address(&self) -> Address {
        self.wallet.address()
    }

    #[instrument(skip(self), level = "debug")]
    async fn is_spent(&self, contract: Address, nullifier_hash: H256) -> ChainResult<bool> {
        self.mixer(contract)
            .is_spent(nullifier_hash.to_fixed_bytes())
            .call()
            .await
            .map_err(ChainCommunicationError::from_contract_error)
    }

    #[instrument(skip(self), level = "debug")]
    async fn is_known_root(&self, contract: Address, root: H256) -> ChainResult<bool> {
        self.mixer(contract)
            .is_known_root(root.to_fixed_bytes())
            .call()
            .await
            .map_err(ChainCommunicationError::from_contract_error)
    }

    #[instrument(skip(self, request), fields(contract = ?request.contract), level = "debug")]
    async fn estimate_withdraw_gas(&self, request: &WithdrawRequest) -> ChainResult<U256> {
        let call = withdraw_call(request);
        let gas = self
            .mixer(request.contract)
            .withdraw(
                call.proof,
                call.root,
                call.nullifier_hash,
                call.recipient,
                call.relayer,
                call.fee,
                call.refund,
            )
            .from(self.relayer_address())
            .value(request.args.refund)
            .estimate_gas()
            .await
            .map_err(ChainCommunicationError::from_contract_error)?;
        debug!(?gas, "Estimated withdraw gas");
        Ok(gas)
    }

    fn encode_withdraw(&self, request: &WithdrawRequest) -> ChainResult<Bytes> {
        Ok(encode_withdraw_call(request))
    }

    async fn pending_transaction_count(&self) -> ChainResult<U256> {
        self.provider
            .get_transaction_count(self.relayer_address(), Some(BlockNumber::Pending.into()))
            .await
            .map_err(ChainCommunicationError::from_provider_error)
    }

    #[instrument(skip(self, tx), fields(nonce = %tx.nonce, to = ?tx.to), level = "debug")]
    async fn sign_and_send(&self, tx: &RelayTransaction) -> ChainResult<H256> {
        let request: TypedTransaction = TransactionRequest::new()
            .from(tx.from)
            .to(tx.to)
            .value(tx.value)
            .gas(tx.gas)
            .gas_price(tx.gas_price)
            .data(tx.data.clone())
            .nonce(tx.nonce)
            .chain_id(tx.chain_id)
            .into();

        let signature = self
            .wallet
            .sign_transaction(&request)
            .await
            .map_err(|e| ChainCommunicationError::SigningError(e.to_string()))?;
        let raw = request.rlp_signed(&signature);

        let pending = self
            .provider
            .send_raw_transaction(raw)
            .await
            .map_err(classify_broadcast_error)?;
        let tx_hash = pending.tx_hash();
        info!(?tx_hash, "Transaction accepted into the pending pool");
        Ok(tx_hash)
    }
}
