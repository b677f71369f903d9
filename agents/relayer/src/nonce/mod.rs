use std::sync::Arc;

use mixer_base::db::DbError;
use mixer_core::{Address, U256};
use tracing::{info, warn};

pub use db::NonceDb;

mod db;

/// Errors of the nonce coordinator
#[derive(Debug, thiserror::Error)]
pub enum NonceError {
    /// The persisted counter could not be read or written
    #[error("Nonce storage failed: {0}")]
    DbError(#[from] DbError),
}

/// Result of a nonce operation
pub type NonceResult<T> = Result<T, NonceError>;

/// Owns the relayer account's next-nonce counter. The counter is persisted
/// after every change, so a restarted relayer resumes where it stopped.
///
/// Only the submission worker mutates the counter, which keeps reads and
/// writes totally ordered without locking.
pub struct NonceCoordinator {
    db: Arc<dyn NonceDb>,
    address: Address,
}

impl NonceCoordinator {
    /// Coordinate nonces of `address`, persisted in `db`
    pub fn new(db: Arc<dyn NonceDb>, address: Address) -> Self {
        Self { db, address }
    }

    /// The account whose nonces are coordinated
    pub fn address(&self) -> Address {
        self.address
    }

    /// The next nonce that would be handed out
    pub async fn next_nonce(&self) -> NonceResult<U256> {
        Ok(self
            .db
            .retrieve_nonce_by_signer_address(&self.address)
            .await?
            .unwrap_or_default())
    }

    /// Hand out the next nonce and advance the counter past it before the
    /// transaction using it is broadcast.
    pub async fn reserve(&self) -> NonceResult<U256> {
        let nonce = self.next_nonce().await?;
        self.store(nonce.saturating_add(U256::one())).await?;
        Ok(nonce)
    }

    /// `used` was refused as already taken: hand out the following nonce and
    /// advance the counter past it.
    pub async fn skip_conflicting(&self, used: U256) -> NonceResult<U256> {
        let nonce = used.saturating_add(U256::one());
        self.store(nonce.saturating_add(U256::one())).await?;
        warn!(?used, ?nonce, "Skipping conflicting nonce");
        Ok(nonce)
    }

    /// Make sure the counter is not behind `chain_count`, the number of
    /// transactions the chain already knows from this account.
    pub async fn sync_with_chain(&self, chain_count: U256) -> NonceResult<U256> {
        let stored = self.next_nonce().await?;
        if chain_count > stored {
            info!(?stored, ?chain_count, "Nonce counter behind chain, fast-forwarding");
            self.store(chain_count).await?;
            return Ok(chain_count);
        }
        info!(?stored, ?chain_count, "Nonce counter in sync with chain");
        Ok(stored)
    }

    async fn store(&self, next: U256) -> NonceResult<()> {
        self.db
            .store_nonce_by_signer_address(&self.address, &next)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use mixer_base::db::{test_utils::tmp_db, RelayerRocksDB};

    use super::*;

    fn coordinator() -> (tempfile::TempDir, NonceCoordinator) {
        let (dir, db) = tmp_db();
        let db = Arc::new(RelayerRocksDB::new(1, db));
        (dir, NonceCoordinator::new(db, Address::repeat_byte(7)))
    }

    #[tokio::test]
    async fn reserve_hands_out_consecutive_nonces() {
        let (_dir, nonces) = coordinator();
        for expected in 0..5u64 {
            assert_eq!(nonces.reserve().await.unwrap(), U256::from(expected));
        }
        assert_eq!(nonces.next_nonce().await.unwrap(), U256::from(5));
    }

    #[tokio::test]
    async fn skipping_advances_past_the_new_nonce() {
        let (_dir, nonces) = coordinator();
        let used = nonces.reserve().await.unwrap();
        let retried = nonces.skip_conflicting(used).await.unwrap();
        assert_eq!(retried, used + 1);
        assert_eq!(nonces.next_nonce().await.unwrap(), used + 2);
        assert_eq!(nonces.reserve().await.unwrap(), used + 2);
    }

    #[tokio::test]
    async fn sync_only_moves_forward() {
        let (_dir, nonces) = coordinator();
        assert_eq!(
            nonces.sync_with_chain(U256::from(10)).await.unwrap(),
            U256::from(10)
        );
        assert_eq!(
            nonces.sync_with_chain(U256::from(3)).await.unwrap(),
            U256::from(10)
        );
        assert_eq!(nonces.reserve().await.unwrap(), U256::from(10));
    }
}
