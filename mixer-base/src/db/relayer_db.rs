use serde::{de::DeserializeOwned, Serialize};
use tracing::trace;

use super::{DbResult, TypedDB, DB};

/// DB handle for storing data tied to one relayer deployment (network).
#[derive(Debug, Clone)]
pub struct RelayerRocksDB(TypedDB);

impl std::ops::Deref for RelayerRocksDB {
    type Target = TypedDB;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<TypedDB> for RelayerRocksDB {
    fn as_ref(&self) -> &TypedDB {
        &self.0
    }
}

impl AsRef<DB> for RelayerRocksDB {
    fn as_ref(&self) -> &DB {
        self.0.as_ref()
    }
}

impl RelayerRocksDB {
    /// Instantiate a new `RelayerRocksDB` for network `net_id`. Keys are
    /// scoped by the network id.
    pub fn new(net_id: u64, db: DB) -> Self {
        Self(TypedDB::new(format!("net_{net_id}"), db))
    }

    /// Store `value` under `prefix` + `key`
    pub fn store_value_by_key<K: AsRef<[u8]>, V: Serialize>(
        &self,
        prefix: &str,
        key: K,
        value: &V,
    ) -> DbResult<()> {
        trace!(prefix, "Storing value");
        self.store_value(prefix, key, value)
    }

    /// Retrieve the value under `prefix` + `key`
    pub fn retrieve_value_by_key<K: AsRef<[u8]>, V: DeserializeOwned>(
        &self,
        prefix: &str,
        key: K,
    ) -> DbResult<Option<V>> {
        self.retrieve_value(prefix, key)
    }

    /// Delete the value under `prefix` + `key`
    pub fn delete_value_by_key<K: AsRef<[u8]>>(&self, prefix: &str, key: K) -> DbResult<()> {
        trace!(prefix, "Deleting value");
        self.delete_value(prefix, key)
    }

    /// All values under `prefix`, ordered by their key bytes
    pub fn retrieve_values_by_prefix_ordered<V: DeserializeOwned>(
        &self,
        prefix: &str,
    ) -> DbResult<Vec<V>> {
        self.retrieve_values_by_prefix(prefix)
    }
}
