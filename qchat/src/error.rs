//! Chat-layer errors and conversions from the lower layers.

use std::error::Error;
use std::fmt::{Display, Formatter};

use qpool::{PoolError, PoolErrorKind};
use qprovider::{GenerateError, GenerateErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatErrorKind {
    InvalidRequest,
    NoCredential,
    QuotaExceeded,
    Blocked,
    Provider,
    Store,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatError {
    pub kind: ChatErrorKind,
    pub message: String,
}

impl ChatError {
    pub fn new(kind: ChatErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::InvalidRequest, message)
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Provider, message)
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Store, message)
    }
}

impl Display for ChatError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for ChatError {}

impl From<GenerateError> for ChatError {
    fn from(value: GenerateError) -> Self {
        let kind = match value.kind {
            GenerateErrorKind::NoCredential => ChatErrorKind::NoCredential,
            GenerateErrorKind::QuotaExceeded => ChatErrorKind::QuotaExceeded,
            GenerateErrorKind::ContentBlocked => ChatErrorKind::Blocked,
            GenerateErrorKind::TransientProvider => ChatErrorKind::Provider,
        };

        ChatError::new(kind, value.message)
    }
}

impl From<PoolError> for ChatError {
    fn from(value: PoolError) -> Self {
        let kind = match value.kind {
            PoolErrorKind::NoCredential => ChatErrorKind::NoCredential,
            PoolErrorKind::Store => ChatErrorKind::Store,
            PoolErrorKind::Coordinator => ChatErrorKind::Provider,
        };

        ChatError::new(kind, value.message)
    }
}
