//! Pool-layer errors and classification.

use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolErrorKind {
    NoCredential,
    Store,
    Coordinator,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolError {
    pub kind: PoolErrorKind,
    pub message: String,
}

impl PoolError {
    pub fn new(kind: PoolErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn no_credential(message: impl Into<String>) -> Self {
        Self::new(PoolErrorKind::NoCredential, message)
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::new(PoolErrorKind::Store, message)
    }

    pub fn coordinator(message: impl Into<String>) -> Self {
        Self::new(PoolErrorKind::Coordinator, message)
    }
}

impl Display for PoolError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for PoolError {}
