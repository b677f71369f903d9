use ethers::providers::{ProviderError, RpcError};
use mixer_core::ChainCommunicationError;
use tracing::{debug, warn};

/// Fragments of node error messages that mean the nonce of a broadcast
/// transaction is already used or already taken by a pending transaction.
/// Matched against the lowercased message with `_` replaced by spaces.
const NONCE_CONFLICT_SIGNATURES: &[&str] = &[
    "nonce too low",
    "nonce is too low",
    "another transaction with same nonce",
    "replacement transaction underpriced",
];

/// Whether a node error message reports a nonce conflict
pub fn is_nonce_conflict_message(message: &str) -> bool {
    let msg = message.to_ascii_lowercase().replace('_', " ");
    NONCE_CONFLICT_SIGNATURES
        .iter()
        .any(|signature| msg.contains(signature))
}

/// Classify an error returned while broadcasting a transaction.
///
/// JSON-RPC error responses are inspected for nonce conflicts; everything
/// else (transport failures, malformed responses) is a provider error.
pub fn classify_broadcast_error(err: ProviderError) -> ChainCommunicationError {
    let nonce_conflict = match err.as_error_response() {
        Some(response) => {
            debug!(code = response.code, message = %response.message, "Broadcast rejected by node");
            is_nonce_conflict_message(&response.message)
        }
        // some nodes answer with a plain text body instead of a json-rpc error
        None => matches!(err, ProviderError::CustomError(ref msg) if is_nonce_conflict_message(msg)),
    };

    if nonce_conflict {
        warn!(error = %err, "Nonce conflict on broadcast");
        ChainCommunicationError::NonceConflict(err.to_string())
    } else {
        ChainCommunicationError::from_provider_error(err)
    }
}

#[cfg(test)]
mod tests {
    use ethers::providers::{HttpClientError, JsonRpcError};

    use super::*;

    fn json_rpc_error(code: i64, message: &str) -> ProviderError {
        ProviderError::JsonRpcClientError(Box::new(HttpClientError::JsonRpcError(JsonRpcError {
            code,
            message: message.to_owned(),
            data: None,
        })))
    }

    #[test]
    fn matches_known_nonce_conflict_messages() {
        for message in [
            "nonce too low",
            "Nonce too low: next nonce 5, tx nonce 4",
            "NONCE_TOO_LOW",
            "the tx doesn't have the correct nonce. account has nonce of: 7 tx has nonce of: 6 (nonce is too low)",
            "Transaction with the same hash was already imported. another transaction with same nonce in the queue",
            "replacement transaction underpriced",
        ] {
            assert!(is_nonce_conflict_message(message), "{message}");
        }
    }

    #[test]
    fn ignores_unrelated_messages() {
        for message in [
            "insufficient funds for gas * price + value",
            "execution reverted: The note has been already spent",
            "nonce too high",
            "already known",
        ] {
            assert!(!is_nonce_conflict_message(message), "{message}");
        }
    }

    #[test]
    fn json_rpc_nonce_errors_are_typed() {
        let err = classify_broadcast_error(json_rpc_error(-32000, "nonce too low"));
        assert!(err.is_nonce_conflict());

        let err = classify_broadcast_error(json_rpc_error(
            -32000,
            "replacement transaction underpriced",
        ));
        assert!(err.is_nonce_conflict());
    }

    #[test]
    fn other_json_rpc_errors_are_provider_errors() {
        let err = classify_broadcast_error(json_rpc_error(-32000, "insufficient funds"));
        assert!(matches!(err, ChainCommunicationError::ProviderError(_)));
    }

    #[test]
    fn plain_text_nonce_errors_are_typed() {
        let err = classify_broadcast_error(ProviderError::CustomError(
            "Transaction nonce is too low. Try incrementing the nonce.".into(),
        ));
        assert!(err.is_nonce_conflict());

        let err = classify_broadcast_error(ProviderError::CustomError("timeout".into()));
        assert!(!err.is_nonce_conflict());
    }
}
