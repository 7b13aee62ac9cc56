//! Round-robin credential selection with health-based skipping.
//!
//! ```rust
//! use qpool::CredentialPool;
//!
//! let mut pool = CredentialPool::new(vec!["sk-a".to_string(), "sk-b".to_string()]);
//! let first = pool.select().expect("pool is non-empty");
//! let second = pool.select().expect("pool is non-empty");
//! assert_eq!((first.index, second.index), (0, 1));
//! ```

use std::sync::Arc;
use std::time::SystemTime;

use crate::{CredentialHealth, CredentialRecord, CredentialSecret, FailureClass, PoolError};

/// Consecutive non-quota failures after which a credential is taken out of
/// rotation.
pub const UNHEALTHY_THRESHOLD: u32 = 3;

/// A pool pick handed to callers. The secret is shared, not copied; the
/// single underlying allocation is zeroed when the last holder drops it.
#[derive(Debug, Clone)]
pub struct SelectedCredential {
    pub index: usize,
    pub secret: Arc<CredentialSecret>,
}

#[derive(Debug, Default)]
pub struct CredentialPool {
    records: Vec<CredentialRecord>,
    cursor: usize,
}

impl CredentialPool {
    pub fn new(secrets: Vec<String>) -> Self {
        let records = secrets
            .into_iter()
            .enumerate()
            .map(|(index, secret)| CredentialRecord::new(index, secret))
            .collect();

        Self { records, cursor: 0 }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Picks the next usable credential, round-robin from the cursor.
    ///
    /// Unhealthy and quota-exhausted records are skipped. When a full scan
    /// finds nothing eligible, the first record is returned anyway so that
    /// callers still attempt the request instead of halting on a possibly
    /// stale health flag.
    pub fn select(&mut self) -> Result<SelectedCredential, PoolError> {
        if self.records.is_empty() {
            return Err(PoolError::no_credential("credential pool is empty"));
        }

        let len = self.records.len();
        for offset in 0..len {
            let index = (self.cursor + offset) % len;
            if self.records[index].eligible() {
                self.cursor = (index + 1) % len;
                return Ok(self.selected(index));
            }
        }

        self.cursor = 1 % len;
        Ok(self.selected(0))
    }

    /// Looks up a specific credential by index, for session affinity.
    pub fn credential_at(&self, index: usize) -> Option<SelectedCredential> {
        self.records.get(index).map(|_| self.selected(index))
    }

    pub fn report_success(&mut self, index: usize) {
        let Some(record) = self.records.get_mut(index) else {
            return;
        };

        record.last_used = Some(SystemTime::now());
        if record.error_count > 0 {
            record.error_count -= 1;
        }

        if record.error_count == 0 {
            record.healthy = true;
        }
    }

    pub fn report_failure(&mut self, index: usize, class: FailureClass) {
        let Some(record) = self.records.get_mut(index) else {
            return;
        };

        record.error_count += 1;
        if class == FailureClass::Quota {
            record.quota_exhausted = true;
        }

        if record.error_count >= UNHEALTHY_THRESHOLD {
            record.healthy = false;
        }
    }

    /// Replaces every record with a fresh one. This is the only operation
    /// that clears `quota_exhausted`.
    pub fn reconfigure(&mut self, secrets: Vec<String>) {
        self.records = secrets
            .into_iter()
            .enumerate()
            .map(|(index, secret)| CredentialRecord::new(index, secret))
            .collect();
        self.cursor = 0;
    }

    pub fn snapshot(&self) -> Vec<CredentialHealth> {
        self.records.iter().map(CredentialHealth::of).collect()
    }

    /// Applies a persisted or remote snapshot onto matching indices.
    /// Entries for indices outside the current pool are ignored.
    pub fn restore(&mut self, snapshot: &[CredentialHealth]) {
        for entry in snapshot {
            if let Some(record) = self.records.get_mut(entry.index) {
                entry.apply_to(record);
            }
        }
    }

    fn selected(&self, index: usize) -> SelectedCredential {
        SelectedCredential {
            index,
            secret: Arc::clone(&self.records[index].secret),
        }
    }
}
