//! Runtime wiring helpers: one call from secrets to a ready assistant.

use std::sync::Arc;

use crate::{
    AssistantService, GenerateTransport, HttpGenerateTransport, InMemoryStateStore, KvSessionStore,
    PoolCoordinator, PoolHandle, ResponseClient, SessionStore, StateStore,
};

/// Everything a caller needs after wiring: the pool handle for health and
/// reconfiguration, the shared state store, and the turn-level service.
#[derive(Clone)]
pub struct RuntimeBundle {
    pub pool: PoolHandle,
    pub state: Arc<dyn StateStore>,
    pub assistant: AssistantService,
}

pub fn in_memory_state() -> Arc<dyn StateStore> {
    Arc::new(InMemoryStateStore::new())
}

/// Default wiring: HTTP transport, in-memory state, sessions persisted
/// into the same flat state store as the credential health snapshot.
pub async fn build_runtime(secrets: Vec<String>) -> RuntimeBundle {
    let transport = Arc::new(HttpGenerateTransport::new(reqwest::Client::new()));
    build_runtime_with(secrets, in_memory_state(), transport).await
}

/// Wiring with an injected state store, for callers backed by durable
/// extension storage rather than process memory.
pub async fn build_runtime_with_state(
    secrets: Vec<String>,
    state: Arc<dyn StateStore>,
) -> RuntimeBundle {
    let transport = Arc::new(HttpGenerateTransport::new(reqwest::Client::new()));
    build_runtime_with(secrets, state, transport).await
}

pub async fn build_runtime_with(
    secrets: Vec<String>,
    state: Arc<dyn StateStore>,
    transport: Arc<dyn GenerateTransport>,
) -> RuntimeBundle {
    let pool = PoolCoordinator::spawn(secrets, Arc::clone(&state)).await;
    let sessions: Arc<dyn SessionStore> = Arc::new(KvSessionStore::new(Arc::clone(&state)));
    let assistant = AssistantService::new(ResponseClient::new(pool.clone(), transport), sessions);

    RuntimeBundle {
        pool,
        state,
        assistant,
    }
}
