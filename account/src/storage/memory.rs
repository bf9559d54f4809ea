//! In-memory account store.
//!
//! Keeps values in a `BTreeMap` and records every applied operation in
//! order, which is what the registration tests lean on to check that resets
//! happen before writes and that rejected input writes nothing at all.
//! Individual keys can be made to fail on `put` to simulate a crash or a
//! full disk halfway through a flow.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashSet};

use super::{AccountStore, StoreError, StoreResult, StoreValue};

/// One applied store operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    Put(String),
    Remove(String),
}

impl StoreOp {
    pub fn key(&self) -> &str {
        match self {
            StoreOp::Put(k) | StoreOp::Remove(k) => k,
        }
    }
}

/// [`AccountStore`] held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryAccountStore {
    values: RwLock<BTreeMap<String, StoreValue>>,
    ops: Mutex<Vec<StoreOp>>,
    failing_puts: RwLock<HashSet<String>>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Operations applied so far, oldest first.
    pub fn ops(&self) -> Vec<StoreOp> {
        self.ops.lock().clone()
    }

    pub fn clear_ops(&self) {
        self.ops.lock().clear();
    }

    /// Make every later `put` to `key` fail with [`StoreError::Unavailable`].
    pub fn fail_puts_to(&self, key: &str) {
        self.failing_puts.write().insert(key.to_string());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.read().contains_key(key)
    }

    /// Copy of everything currently stored.
    pub fn snapshot(&self) -> BTreeMap<String, StoreValue> {
        self.values.read().clone()
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn get(&self, key: &str) -> StoreResult<Option<StoreValue>> {
        Ok(self.values.read().get(key).cloned())
    }

    async fn put(&self, key: &str, value: StoreValue) -> StoreResult<()> {
        if self.failing_puts.read().contains(key) {
            return Err(StoreError::Unavailable(format!("put to {key} refused")));
        }
        self.values.write().insert(key.to_string(), value);
        self.ops.lock().push(StoreOp::Put(key.to_string()));
        Ok(())
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        self.values.write().remove(key);
        self.ops.lock().push(StoreOp::Remove(key.to_string()));
        Ok(())
    }
}
