//! Key-value state persistence contract and a basic in-memory implementation.

use std::collections::HashMap;
use std::sync::Mutex;

use qcommon::BoxFuture;
use serde_json::Value;

use crate::PoolError;

/// Flat key-value persistence, modelled after the browser extension storage
/// area the coordinator writes through: plain keys mapped to JSON values,
/// no schema versioning.
pub trait StateStore: Send + Sync {
    fn get<'a>(
        &'a self,
        keys: &'a [String],
    ) -> BoxFuture<'a, Result<HashMap<String, Value>, PoolError>>;

    fn set<'a>(
        &'a self,
        entries: HashMap<String, Value>,
    ) -> BoxFuture<'a, Result<(), PoolError>>;

    fn remove<'a>(&'a self, keys: &'a [String]) -> BoxFuture<'a, Result<(), PoolError>>;
}

#[derive(Debug, Default)]
pub struct InMemoryStateStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for InMemoryStateStore {
    fn get<'a>(
        &'a self,
        keys: &'a [String],
    ) -> BoxFuture<'a, Result<HashMap<String, Value>, PoolError>> {
        Box::pin(async move {
            let entries = self
                .entries
                .lock()
                .map_err(|_| PoolError::store("state store lock poisoned"))?;

            Ok(keys
                .iter()
                .filter_map(|key| entries.get(key).map(|value| (key.clone(), value.clone())))
                .collect())
        })
    }

    fn set<'a>(&'a self, new: HashMap<String, Value>) -> BoxFuture<'a, Result<(), PoolError>> {
        Box::pin(async move {
            let mut entries = self
                .entries
                .lock()
                .map_err(|_| PoolError::store("state store lock poisoned"))?;

            entries.extend(new);
            Ok(())
        })
    }

    fn remove<'a>(&'a self, keys: &'a [String]) -> BoxFuture<'a, Result<(), PoolError>> {
        Box::pin(async move {
            let mut entries = self
                .entries
                .lock()
                .map_err(|_| PoolError::store("state store lock poisoned"))?;

            for key in keys {
                entries.remove(key);
            }

            Ok(())
        })
    }
}
