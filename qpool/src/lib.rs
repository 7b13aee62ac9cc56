//! Credential pool, health tracking, and the single-instance coordinator.

mod cache;
mod coordinator;
mod error;
mod pool;
mod record;
mod store;

pub use cache::PoolCache;
pub use coordinator::{HEALTH_STATE_KEY, PoolCommand, PoolCoordinator, PoolHandle};
pub use error::{PoolError, PoolErrorKind};
pub use pool::{CredentialPool, SelectedCredential, UNHEALTHY_THRESHOLD};
pub use record::{
    CredentialHealth, CredentialOutcome, CredentialRecord, CredentialSecret, FailureClass,
};
pub use store::{InMemoryStateStore, StateStore};
