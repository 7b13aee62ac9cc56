//! Session persistence contract with in-memory and key-value backends.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use qcommon::{BoxFuture, SessionId};
use qpool::StateStore;
use qprovider::Role;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ChatError, ConversationSession, StoredMessage};

/// Durable storage for conversation sessions, keyed by session id.
///
/// Writes are expected from a single execution context at a time, the same
/// assumption the pool coordinator makes about its storage area. Backends
/// layered over flat key-value storage do not serialize concurrent `save`
/// calls from independent contexts.
pub trait SessionStore: Send + Sync {
    fn load<'a>(
        &'a self,
        id: &'a SessionId,
    ) -> BoxFuture<'a, Result<Option<ConversationSession>, ChatError>>;

    fn save<'a>(&'a self, session: &'a ConversationSession) -> BoxFuture<'a, Result<(), ChatError>>;

    fn remove<'a>(&'a self, ids: Vec<SessionId>) -> BoxFuture<'a, Result<(), ChatError>>;

    fn list<'a>(&'a self) -> BoxFuture<'a, Result<Vec<ConversationSession>, ChatError>>;
}

#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<SessionId, ConversationSession>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for InMemorySessionStore {
    fn load<'a>(
        &'a self,
        id: &'a SessionId,
    ) -> BoxFuture<'a, Result<Option<ConversationSession>, ChatError>> {
        Box::pin(async move {
            let sessions = self
                .sessions
                .lock()
                .map_err(|_| ChatError::store("session store lock poisoned"))?;

            Ok(sessions.get(id).cloned())
        })
    }

    fn save<'a>(&'a self, session: &'a ConversationSession) -> BoxFuture<'a, Result<(), ChatError>> {
        Box::pin(async move {
            let mut sessions = self
                .sessions
                .lock()
                .map_err(|_| ChatError::store("session store lock poisoned"))?;

            sessions.insert(session.id.clone(), session.clone());
            Ok(())
        })
    }

    fn remove<'a>(&'a self, ids: Vec<SessionId>) -> BoxFuture<'a, Result<(), ChatError>> {
        Box::pin(async move {
            let mut sessions = self
                .sessions
                .lock()
                .map_err(|_| ChatError::store("session store lock poisoned"))?;

            for id in ids {
                sessions.remove(&id);
            }

            Ok(())
        })
    }

    fn list<'a>(&'a self) -> BoxFuture<'a, Result<Vec<ConversationSession>, ChatError>> {
        Box::pin(async move {
            let sessions = self
                .sessions
                .lock()
                .map_err(|_| ChatError::store("session store lock poisoned"))?;

            Ok(sessions.values().cloned().collect())
        })
    }
}

const SESSION_KEY_PREFIX: &str = "session/";
const SESSION_INDEX_KEY: &str = "session_index";

/// Sessions serialized into a flat `StateStore`, one JSON value per session
/// plus an id index for listing. Shares a storage area with the credential
/// coordinator without overlapping keys.
///
/// The id index is maintained with a read-modify-write, so this store
/// requires the trait's single-writer assumption; the flat `StateStore`
/// contract has no key enumeration to derive `list` from.
pub struct KvSessionStore {
    state: Arc<dyn StateStore>,
}

impl KvSessionStore {
    pub fn new(state: Arc<dyn StateStore>) -> Self {
        Self { state }
    }

    async fn index(&self) -> Result<Vec<String>, ChatError> {
        let keys = vec![SESSION_INDEX_KEY.to_string()];
        let mut entries = self.state.get(&keys).await.map_err(ChatError::from)?;

        match entries.remove(SESSION_INDEX_KEY) {
            Some(value) => serde_json::from_value(value)
                .map_err(|error| ChatError::store(format!("undecodable session index: {error}"))),
            None => Ok(Vec::new()),
        }
    }

    async fn write_index(&self, index: Vec<String>) -> Result<(), ChatError> {
        let value = serde_json::to_value(index)
            .map_err(|error| ChatError::store(format!("unencodable session index: {error}")))?;
        let entries = HashMap::from([(SESSION_INDEX_KEY.to_string(), value)]);
        self.state.set(entries).await.map_err(ChatError::from)
    }
}

impl SessionStore for KvSessionStore {
    fn load<'a>(
        &'a self,
        id: &'a SessionId,
    ) -> BoxFuture<'a, Result<Option<ConversationSession>, ChatError>> {
        Box::pin(async move {
            let keys = vec![session_key(id)];
            let mut entries = self.state.get(&keys).await.map_err(ChatError::from)?;

            match entries.remove(&keys[0]) {
                Some(value) => decode_session(value).map(Some),
                None => Ok(None),
            }
        })
    }

    fn save<'a>(&'a self, session: &'a ConversationSession) -> BoxFuture<'a, Result<(), ChatError>> {
        Box::pin(async move {
            let record = SessionRecord::of(session);
            let value = serde_json::to_value(record)
                .map_err(|error| ChatError::store(format!("unencodable session: {error}")))?;

            let entries = HashMap::from([(session_key(&session.id), value)]);
            self.state.set(entries).await.map_err(ChatError::from)?;

            let mut index = self.index().await?;
            if !index.iter().any(|entry| entry == session.id.as_str()) {
                index.push(session.id.to_string());
                self.write_index(index).await?;
            }

            Ok(())
        })
    }

    fn remove<'a>(&'a self, ids: Vec<SessionId>) -> BoxFuture<'a, Result<(), ChatError>> {
        Box::pin(async move {
            let keys: Vec<String> = ids.iter().map(session_key).collect();
            self.state.remove(&keys).await.map_err(ChatError::from)?;

            let index = self.index().await?;
            let remaining: Vec<String> = index
                .into_iter()
                .filter(|entry| !ids.iter().any(|id| id.as_str() == entry))
                .collect();

            self.write_index(remaining).await
        })
    }

    fn list<'a>(&'a self) -> BoxFuture<'a, Result<Vec<ConversationSession>, ChatError>> {
        Box::pin(async move {
            let index = self.index().await?;
            let keys: Vec<String> = index
                .iter()
                .map(|id| session_key(&SessionId::new(id.clone())))
                .collect();

            let mut entries = self.state.get(&keys).await.map_err(ChatError::from)?;
            let mut sessions = Vec::with_capacity(keys.len());
            for key in &keys {
                if let Some(value) = entries.remove(key) {
                    sessions.push(decode_session(value)?);
                }
            }

            Ok(sessions)
        })
    }
}

fn session_key(id: &SessionId) -> String {
    format!("{SESSION_KEY_PREFIX}{id}")
}

fn decode_session(value: Value) -> Result<ConversationSession, ChatError> {
    let record: SessionRecord = serde_json::from_value(value)
        .map_err(|error| ChatError::store(format!("undecodable session: {error}")))?;
    record.into_session()
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionRecord {
    id: String,
    bound_credential: usize,
    messages: Vec<MessageRecord>,
    metadata: HashMap<String, String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct MessageRecord {
    role: String,
    text: String,
    timestamp_ms: u64,
}

impl SessionRecord {
    fn of(session: &ConversationSession) -> Self {
        Self {
            id: session.id.to_string(),
            bound_credential: session.bound_credential,
            messages: session.messages.iter().map(MessageRecord::of).collect(),
            metadata: session.metadata.clone(),
        }
    }

    fn into_session(self) -> Result<ConversationSession, ChatError> {
        let mut messages = Vec::with_capacity(self.messages.len());
        for message in self.messages {
            messages.push(message.into_message()?);
        }

        Ok(ConversationSession {
            id: SessionId::new(self.id),
            bound_credential: self.bound_credential,
            messages,
            metadata: self.metadata,
        })
    }
}

impl MessageRecord {
    fn of(message: &StoredMessage) -> Self {
        let timestamp_ms = message
            .timestamp
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or(0);

        Self {
            role: role_tag(message.role).to_string(),
            text: message.text.clone(),
            timestamp_ms,
        }
    }

    fn into_message(self) -> Result<StoredMessage, ChatError> {
        let role = match self.role.as_str() {
            "user" => Role::User,
            "assistant" => Role::Assistant,
            other => {
                return Err(ChatError::store(format!(
                    "unknown stored message role: {other}"
                )));
            }
        };

        Ok(StoredMessage {
            role,
            text: self.text,
            timestamp: UNIX_EPOCH + Duration::from_millis(self.timestamp_ms),
        })
    }
}

fn role_tag(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}
