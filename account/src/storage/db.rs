//! # SledAccountStore: Persistent Account State
//!
//! The on-disk account store, built on sled's embedded key-value store.
//!
//! ## Tree Layout
//!
//! | Tree            | Key              | Value                  |
//! |-----------------|------------------|------------------------|
//! | `account`       | key (UTF-8)      | `bincode(StoreValue)`  |
//! | `conversations` | account id (hex) | `bincode(Conversation)`|
//!
//! The `conversations` tree is owned by `SledConversationController`, which
//! opens it through [`SledAccountStore::open_tree`] so that both live in one
//! database directory.
//!
//! ## Durability
//!
//! Every write is followed by a flush. The registration flows rely on each
//! individual `put`/`remove` having hit disk before the next one starts.

use async_trait::async_trait;
use sled::{Db, Tree};
use std::path::Path;

use super::{AccountStore, StoreError, StoreResult, StoreValue};

/// Sled-backed [`AccountStore`].
///
/// Cheap to clone: clones share the same underlying database handle.
#[derive(Debug, Clone)]
pub struct SledAccountStore {
    /// The underlying sled database handle.
    db: Db,
    /// Account key-value pairs.
    account: Tree,
}

impl SledAccountStore {
    /// Open or create a store at the given filesystem path.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Create a temporary store that is deleted when dropped. For tests.
    pub fn open_temporary() -> StoreResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> StoreResult<Self> {
        let account = db.open_tree("account")?;
        Ok(Self { db, account })
    }

    /// Open a named tree in the same database. Created if missing.
    pub fn open_tree(&self, name: &str) -> StoreResult<Tree> {
        Ok(self.db.open_tree(name)?)
    }

    /// All keys currently present in the account tree.
    pub fn keys(&self) -> StoreResult<Vec<String>> {
        let mut out = Vec::new();
        for entry in self.account.iter() {
            let (key, _) = entry?;
            out.push(String::from_utf8_lossy(&key).into_owned());
        }
        Ok(out)
    }
}

#[async_trait]
impl AccountStore for SledAccountStore {
    async fn get(&self, key: &str) -> StoreResult<Option<StoreValue>> {
        match self.account.get(key.as_bytes())? {
            Some(bytes) => {
                let value = bincode::deserialize(&bytes)
                    .map_err(|e| StoreError::Serialization(e.to_string()))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn put(&self, key: &str, value: StoreValue) -> StoreResult<()> {
        let bytes =
            bincode::serialize(&value).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.account.insert(key.as_bytes(), bytes)?;
        self.account.flush_async().await?;
        tracing::trace!(key, "account store put");
        Ok(())
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        self.account.remove(key.as_bytes())?;
        self.account.flush_async().await?;
        tracing::trace!(key, "account store remove");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_remove() {
        let store = SledAccountStore::open_temporary().unwrap();
        assert!(store.get("password").await.unwrap().is_none());

        store
            .put("password", StoreValue::Text("hunter2".into()))
            .await
            .unwrap();
        assert_eq!(
            store.get("password").await.unwrap(),
            Some(StoreValue::Text("hunter2".into()))
        );

        store.remove("password").await.unwrap();
        assert!(store.get("password").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn removing_missing_key_is_fine() {
        let store = SledAccountStore::open_temporary().unwrap();
        store.remove("never-written").await.unwrap();
    }

    #[tokio::test]
    async fn last_write_wins() {
        let store = SledAccountStore::open_temporary().unwrap();
        store.put("flag", StoreValue::Bool(true)).await.unwrap();
        store.put("flag", StoreValue::Bool(false)).await.unwrap();
        assert_eq!(store.get("flag").await.unwrap(), Some(StoreValue::Bool(false)));
    }

    #[tokio::test]
    async fn survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = SledAccountStore::open(dir.path()).unwrap();
            store.put("number_id", StoreValue::Text("05ab.1".into())).await.unwrap();
        }
        let store = SledAccountStore::open(dir.path()).unwrap();
        assert_eq!(
            store.get("number_id").await.unwrap(),
            Some(StoreValue::Text("05ab.1".into()))
        );
        assert_eq!(store.keys().unwrap(), vec!["number_id".to_string()]);
    }
}
