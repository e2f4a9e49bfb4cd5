/*!
Storage backend abstraction (§6): the only side-effectful dependency, wrapping
[object_store]'s primitives plus an optional atomic `put_if_absent` used for the commit swap.
Grounded in the teacher's `transaction/mod.rs` and `table/transaction.rs`, which called
`object_store::ObjectStore` directly (`put`, `copy_if_not_exists`, `delete`) inline inside the
commit path; this trait lifts that usage out so the catalog can be generic over any backend.
*/
use async_trait::async_trait;
use object_store::path::Path;
use object_store::{Error as ObjectStoreError, ObjectStore};

use crate::error::{IcebergError, Result};

/// The storage operations the catalog's commit loop and table reads depend on.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Reads the full contents of `key`, or `None` if it doesn't exist.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    /// Writes `bytes` to `key`, overwriting any existing content.
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()>;
    /// Deletes `key`. Idempotent: deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;
    /// Lists every key under `prefix`.
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;
    /// `true` iff `key` exists.
    async fn exists(&self, key: &str) -> Result<bool>;
    /// Writes `bytes` to `key` only if it doesn't already exist, returning `true` on success
    /// and `false` if `key` was already present. Backends without a native atomic primitive
    /// may approximate this with `exists` + `put`, which is race-prone; the catalog's retry
    /// loop is what makes that acceptable (§5).
    async fn put_if_absent(&self, key: &str, bytes: Vec<u8>) -> Result<bool>;
}

/// Adapts any [object_store::ObjectStore] into a [Storage] backend.
pub struct ObjectStoreBackend<O: ObjectStore> {
    store: O,
}

impl<O: ObjectStore> ObjectStoreBackend<O> {
    /// Wraps `store`.
    pub fn new(store: O) -> Self {
        ObjectStoreBackend { store }
    }
}

fn map_err(err: ObjectStoreError) -> IcebergError {
    IcebergError::StorageUnavailable(err.to_string())
}

#[async_trait]
impl<O: ObjectStore> Storage for ObjectStoreBackend<O> {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = Path::from(key);
        match self.store.get(&path).await {
            Ok(result) => Ok(Some(result.bytes().await.map_err(map_err)?.to_vec())),
            Err(ObjectStoreError::NotFound { .. }) => Ok(None),
            Err(err) => Err(map_err(err)),
        }
    }

    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        let path = Path::from(key);
        self.store.put(&path, bytes.into()).await.map_err(map_err)?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = Path::from(key);
        match self.store.delete(&path).await {
            Ok(()) | Err(ObjectStoreError::NotFound { .. }) => Ok(()),
            Err(err) => Err(map_err(err)),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        use futures::TryStreamExt;
        let path = Path::from(prefix);
        let entries: Vec<_> = self.store.list(Some(&path)).try_collect().await.map_err(map_err)?;
        Ok(entries.into_iter().map(|m| m.location.to_string()).collect())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let path = Path::from(key);
        match self.store.head(&path).await {
            Ok(_) => Ok(true),
            Err(ObjectStoreError::NotFound { .. }) => Ok(false),
            Err(err) => Err(map_err(err)),
        }
    }

    async fn put_if_absent(&self, key: &str, bytes: Vec<u8>) -> Result<bool> {
        // object_store 0.5 has no native "create if absent" primitive; mirror the teacher's
        // write-temp-then-copy_if_not_exists commit pattern (`transaction/mod.rs`) instead.
        let final_path = Path::from(key);
        let temp_path = Path::from(format!("{key}.{}.tmp", uuid::Uuid::new_v4()));
        self.store.put(&temp_path, bytes.into()).await.map_err(map_err)?;
        let result = match self.store.copy_if_not_exists(&temp_path, &final_path).await {
            Ok(()) => Ok(true),
            Err(ObjectStoreError::AlreadyExists { .. }) => Ok(false),
            Err(err) => Err(map_err(err)),
        };
        let _ = self.store.delete(&temp_path).await;
        result
    }
}
