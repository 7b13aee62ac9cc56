//! Generation error kinds and transport failure classification.
//!
//! ```rust
//! use qprovider::{GenerateError, GenerateErrorKind, classify_failure};
//!
//! let quota = classify_failure(Some(429), "slow down");
//! assert_eq!(quota.kind, GenerateErrorKind::QuotaExceeded);
//!
//! let worded = classify_failure(Some(500), "Quota exceeded for this project");
//! assert_eq!(worded.kind, GenerateErrorKind::QuotaExceeded);
//!
//! let transient = classify_failure(Some(503), "backend overloaded");
//! assert_eq!(transient.kind, GenerateErrorKind::TransientProvider);
//! ```

use std::error::Error;
use std::fmt::{Display, Formatter};

use qpool::{FailureClass, PoolError, PoolErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerateErrorKind {
    NoCredential,
    QuotaExceeded,
    TransientProvider,
    ContentBlocked,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateError {
    pub kind: GenerateErrorKind,
    pub message: String,
}

impl GenerateError {
    pub fn new(kind: GenerateErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn no_credential(message: impl Into<String>) -> Self {
        Self::new(GenerateErrorKind::NoCredential, message)
    }

    pub fn quota(message: impl Into<String>) -> Self {
        Self::new(GenerateErrorKind::QuotaExceeded, message)
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(GenerateErrorKind::TransientProvider, message)
    }

    pub fn blocked(message: impl Into<String>) -> Self {
        Self::new(GenerateErrorKind::ContentBlocked, message)
    }

    /// How this error should be reported to the credential pool.
    /// `None` means the error is not a credential fault.
    pub fn failure_class(&self) -> Option<FailureClass> {
        match self.kind {
            GenerateErrorKind::QuotaExceeded => Some(FailureClass::Quota),
            GenerateErrorKind::TransientProvider => Some(FailureClass::Transient),
            GenerateErrorKind::NoCredential | GenerateErrorKind::ContentBlocked => None,
        }
    }
}

impl Display for GenerateError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for GenerateError {}

impl From<PoolError> for GenerateError {
    fn from(value: PoolError) -> Self {
        match value.kind {
            PoolErrorKind::NoCredential => GenerateError::no_credential(value.message),
            PoolErrorKind::Store | PoolErrorKind::Coordinator => {
                GenerateError::transient(value.message)
            }
        }
    }
}

const QUOTA_MARKERS: &[&str] = &["quota", "rate limit", "resource_exhausted", "too many requests"];

/// Classifies a transport-level failure from its HTTP status and error text.
/// Quota and rate-limit signals win over everything else; the rest counts as
/// a transient provider fault.
pub fn classify_failure(status: Option<u16>, message: &str) -> GenerateError {
    let lowered = message.to_lowercase();
    if status == Some(429) || QUOTA_MARKERS.iter().any(|marker| lowered.contains(marker)) {
        return GenerateError::quota(message.to_string());
    }

    GenerateError::transient(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_wording_classifies_as_quota_regardless_of_status() {
        let error = classify_failure(Some(400), "Quota exceeded for quota metric");
        assert_eq!(error.kind, GenerateErrorKind::QuotaExceeded);

        let error = classify_failure(None, "RESOURCE_EXHAUSTED");
        assert_eq!(error.kind, GenerateErrorKind::QuotaExceeded);
    }

    #[test]
    fn status_429_is_quota_even_without_wording() {
        let error = classify_failure(Some(429), "come back later");
        assert_eq!(error.kind, GenerateErrorKind::QuotaExceeded);
    }

    #[test]
    fn other_failures_are_transient() {
        let error = classify_failure(Some(500), "internal error");
        assert_eq!(error.kind, GenerateErrorKind::TransientProvider);

        let error = classify_failure(None, "connection reset");
        assert_eq!(error.kind, GenerateErrorKind::TransientProvider);
    }

    #[test]
    fn failure_class_maps_onto_pool_reporting() {
        assert_eq!(
            GenerateError::quota("q").failure_class(),
            Some(FailureClass::Quota)
        );
        assert_eq!(
            GenerateError::transient("t").failure_class(),
            Some(FailureClass::Transient)
        );
        assert_eq!(GenerateError::blocked("b").failure_class(), None);
        assert_eq!(GenerateError::no_credential("n").failure_class(), None);
    }

    #[test]
    fn pool_errors_convert_with_kind_preserved() {
        let empty = GenerateError::from(PoolError::no_credential("empty"));
        assert_eq!(empty.kind, GenerateErrorKind::NoCredential);

        let gone = GenerateError::from(PoolError::coordinator("gone"));
        assert_eq!(gone.kind, GenerateErrorKind::TransientProvider);
    }
}
