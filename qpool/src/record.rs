//! Per-credential secret handling, health state, and outcome kinds.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Not `Clone`: each secret has exactly one allocation, zeroed on drop.
/// Shared ownership goes through `Arc<CredentialSecret>`.
#[derive(PartialEq, Eq)]
pub struct CredentialSecret {
    value: String,
}

impl CredentialSecret {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    pub fn expose(&self) -> &str {
        self.value.as_str()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

impl std::fmt::Debug for CredentialSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl Drop for CredentialSecret {
    fn drop(&mut self) {
        unsafe {
            self.value.as_mut_vec().fill(0);
        }
    }
}

/// How a reported failure affects credential health.
///
/// `Quota` marks the credential exhausted until the pool is reconfigured;
/// `Transient` only bumps the error counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    Quota,
    Transient,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialOutcome {
    Success,
    Failure(FailureClass),
}

#[derive(Debug)]
pub struct CredentialRecord {
    pub index: usize,
    pub secret: Arc<CredentialSecret>,
    pub healthy: bool,
    pub quota_exhausted: bool,
    pub error_count: u32,
    pub last_used: Option<SystemTime>,
}

impl CredentialRecord {
    pub fn new(index: usize, secret: impl Into<String>) -> Self {
        Self {
            index,
            secret: Arc::new(CredentialSecret::new(secret)),
            healthy: true,
            quota_exhausted: false,
            error_count: 0,
            last_used: None,
        }
    }

    pub fn eligible(&self) -> bool {
        self.healthy && !self.quota_exhausted
    }
}

/// Secret-free health snapshot of one record, as persisted and as shipped
/// to cached pool views in other execution contexts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialHealth {
    pub index: usize,
    pub healthy: bool,
    pub quota_exhausted: bool,
    pub error_count: u32,
    pub last_used_ms: Option<u64>,
}

impl CredentialHealth {
    pub fn of(record: &CredentialRecord) -> Self {
        Self {
            index: record.index,
            healthy: record.healthy,
            quota_exhausted: record.quota_exhausted,
            error_count: record.error_count,
            last_used_ms: record.last_used.and_then(|at| {
                at.duration_since(UNIX_EPOCH)
                    .ok()
                    .map(|elapsed| elapsed.as_millis() as u64)
            }),
        }
    }

    pub fn apply_to(&self, record: &mut CredentialRecord) {
        record.healthy = self.healthy;
        record.quota_exhausted = self.quota_exhausted;
        record.error_count = self.error_count;
        record.last_used = self
            .last_used_ms
            .map(|ms| UNIX_EPOCH + Duration::from_millis(ms));
    }
}
