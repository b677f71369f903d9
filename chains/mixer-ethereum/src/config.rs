use derive_new::new;

/// Ethereum connection configuration
#[derive(Debug, Clone, new)]
pub struct ConnectionConf {
    /// Url of the JSON-RPC node
    pub url: String,
    /// EIP-155 chain id transactions are signed for
    pub chain_id: u64,
}
