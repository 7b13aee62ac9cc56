//! Conversation sessions with credential affinity and turn orchestration.

mod error;
mod service;
mod store;
mod types;

pub mod prelude {
    pub use crate::{
        AssistantService, ChatError, ChatErrorKind, ConversationSession, InMemorySessionStore,
        KvSessionStore, SessionStore, StoredMessage, TurnEvent, TurnEventStream, TurnOptions,
        TurnResult, spawn_idle_cleanup,
    };
    pub use qcommon::{GenerationOptions, MetadataMap, SessionId};
}

pub use error::{ChatError, ChatErrorKind};
pub use service::{AssistantService, spawn_idle_cleanup};
pub use store::{InMemorySessionStore, KvSessionStore, SessionStore};
pub use types::{
    ConversationSession, StoredMessage, TurnEvent, TurnEventStream, TurnOptions, TurnResult,
};
