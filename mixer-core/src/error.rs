/// The result of interacting with a chain.
pub type ChainResult<T> = Result<T, ChainCommunicationError>;

/// ChainCommunicationError contains errors returned when attempting to
/// call a chain or broadcast a transaction.
///
/// Chain implementations are responsible for classifying node errors into
/// these variants; callers must never inspect error text themselves.
#[derive(Debug, thiserror::Error)]
pub enum ChainCommunicationError {
    /// The node refused the transaction because its nonce is already used or
    /// already pending (stale nonce, underpriced replacement).
    #[error("Nonce conflict: {0}")]
    NonceConflict(String),
    /// A contract call or gas estimation reverted or could not be decoded
    #[error("Contract error: {0}")]
    ContractError(String),
    /// The RPC transport or the node itself failed
    #[error("Provider error: {0}")]
    ProviderError(String),
    /// Signing the transaction failed
    #[error("Signing error: {0}")]
    SigningError(String),
    /// Any other error
    #[error("{0}")]
    CustomError(String),
}

impl ChainCommunicationError {
    /// Whether retrying with a higher nonce may succeed
    pub fn is_nonce_conflict(&self) -> bool {
        matches!(self, Self::NonceConflict(_))
    }

    /// Create a contract error from anything printable
    pub fn from_contract_error<E: std::fmt::Display>(err: E) -> Self {
        Self::ContractError(err.to_string())
    }

    /// Create a provider error from anything printable
    pub fn from_provider_error<E: std::fmt::Display>(err: E) -> Self {
        Self::ProviderError(err.to_string())
    }
}
