use async_trait::async_trait;
use mixer_base::db::{DbResult, RelayerRocksDB};
use mixer_core::{Address, U256};

const NEXT_NONCE_BY_SIGNER_ADDRESS_STORAGE_PREFIX: &str = "next_nonce_by_signer_address_";

/// Persistence of the next nonce to use, per signing account
#[async_trait]
pub trait NonceDb: Send + Sync {
    /// Retrieve the next nonce to use for `signer_address`
    async fn retrieve_nonce_by_signer_address(
        &self,
        signer_address: &Address,
    ) -> DbResult<Option<U256>>;

    /// Store the next nonce to use for `signer_address`
    async fn store_nonce_by_signer_address(
        &self,
        signer_address: &Address,
        nonce: &U256,
    ) -> DbResult<()>;
}

#[async_trait]
impl NonceDb for RelayerRocksDB {
    async fn retrieve_nonce_by_signer_address(
        &self,
        signer_address: &Address,
    ) -> DbResult<Option<U256>> {
        self.retrieve_value_by_key(NEXT_NONCE_BY_SIGNER_ADDRESS_STORAGE_PREFIX, signer_address)
    }

    async fn store_nonce_by_signer_address(
        &self,
        signer_address: &Address,
        nonce: &U256,
    ) -> DbResult<()> {
        self.store_value_by_key(
            NEXT_NONCE_BY_SIGNER_ADDRESS_STORAGE_PREFIX,
            signer_address,
            nonce,
        )
    }
}

#[cfg(test)]
mod tests {
    use mixer_base::db::test_utils::tmp_db;

    use super::*;

    #[tokio::test]
    async fn test_nonce_db_per_signer() {
        let (_dir, db) = tmp_db();
        let nonce_db = RelayerRocksDB::new(1, db);
        let signer = Address::repeat_byte(1);
        let other = Address::repeat_byte(2);

        assert_eq!(
            nonce_db.retrieve_nonce_by_signer_address(&signer).await.unwrap(),
            None
        );

        nonce_db
            .store_nonce_by_signer_address(&signer, &U256::from(42))
            .await
            .unwrap();
        nonce_db
            .store_nonce_by_signer_address(&signer, &U256::from(43))
            .await
            .unwrap();

        assert_eq!(
            nonce_db.retrieve_nonce_by_signer_address(&signer).await.unwrap(),
            Some(U256::from(43))
        );
        assert_eq!(
            nonce_db.retrieve_nonce_by_signer_address(&other).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_nonce_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let signer = Address::repeat_byte(1);
        {
            let db = mixer_base::db::DB::from_path(dir.path()).unwrap();
            RelayerRocksDB::new(1, db)
                .store_nonce_by_signer_address(&signer, &U256::from(7))
                .await
                .unwrap();
        }
        let db = mixer_base::db::DB::from_path(dir.path()).unwrap();
        assert_eq!(
            RelayerRocksDB::new(1, db)
                .retrieve_nonce_by_signer_address(&signer)
                .await
                .unwrap(),
            Some(U256::from(7))
        );
    }
}
