use derive_new::new;
use serde::{de::DeserializeOwned, Serialize};

use crate::db::{DbResult, DB};

/// DB handle for storing data tied to a specific type/entity.
///
/// Key structure: ```<entity>_<prefix>_<key>```. Values are stored as json.
#[derive(Debug, Clone, new)]
pub struct TypedDB {
    entity: String,
    db: DB,
}

impl AsRef<DB> for TypedDB {
    fn as_ref(&self) -> &DB {
        &self.db
    }
}

impl TypedDB {
    fn full_prefix(&self, prefix: impl AsRef<[u8]>) -> Vec<u8> {
        let mut full_prefix = vec![];
        full_prefix.extend(self.entity.as_bytes());
        full_prefix.extend("_".as_bytes());
        full_prefix.extend(prefix.as_ref());
        full_prefix
    }

    fn full_key(&self, prefix: impl AsRef<[u8]>, key: impl AsRef<[u8]>) -> Vec<u8> {
        let mut full_key = self.full_prefix(prefix);
        full_key.extend(key.as_ref());
        full_key
    }

    /// Store a serializable value
    pub fn store_value<V: Serialize>(
        &self,
        prefix: impl AsRef<[u8]>,
        key: impl AsRef<[u8]>,
        value: &V,
    ) -> DbResult<()> {
        let encoded = serde_json::to_vec(value)?;
        self.db.store(&self.full_key(prefix, key), &encoded)
    }

    /// Retrieve a deserializable value
    pub fn retrieve_value<V: DeserializeOwned>(
        &self,
        prefix: impl AsRef<[u8]>,
        key: impl AsRef<[u8]>,
    ) -> DbResult<Option<V>> {
        self.db
            .retrieve(&self.full_key(prefix, key))?
            .map(|bytes| serde_json::from_slice(&bytes))
            .transpose()
            .map_err(Into::into)
    }

    /// Delete a value
    pub fn delete_value(&self, prefix: impl AsRef<[u8]>, key: impl AsRef<[u8]>) -> DbResult<()> {
        self.db.delete(&self.full_key(prefix, key))
    }

    /// All values stored under `prefix`, ordered by key
    pub fn retrieve_values_by_prefix<V: DeserializeOwned>(
        &self,
        prefix: impl AsRef<[u8]>,
    ) -> DbResult<Vec<V>> {
        self.db
            .retrieve_by_prefix(&self.full_prefix(prefix))?
            .into_iter()
            .map(|(_, bytes)| serde_json::from_slice(&bytes).map_err(Into::into))
            .collect()
    }
}
