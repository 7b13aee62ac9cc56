//! Read-mostly pool view for secondary execution contexts.
//!
//! A page-embedded context keeps its own `PoolCache` so `select` stays a
//! local, synchronous operation. Health state is refreshed on demand from
//! the coordinator; outcome reports and reconfiguration always go through
//! the `PoolHandle`, never through the cache.

use crate::{CredentialPool, PoolError, PoolHandle, SelectedCredential};

#[derive(Debug)]
pub struct PoolCache {
    pool: CredentialPool,
}

impl PoolCache {
    pub fn new(secrets: Vec<String>) -> Self {
        Self {
            pool: CredentialPool::new(secrets),
        }
    }

    /// Pulls the coordinator's current health snapshot into this view.
    pub async fn refresh(&mut self, handle: &PoolHandle) -> Result<(), PoolError> {
        let snapshot = handle.snapshot().await?;
        self.pool.restore(&snapshot);
        Ok(())
    }

    /// Local selection over possibly stale health state. The cursor here is
    /// independent of the coordinator's, which is fine: fairness is a
    /// per-context property, health flags are the shared part.
    pub fn select(&mut self) -> Result<SelectedCredential, PoolError> {
        self.pool.select()
    }

    pub fn len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }
}
