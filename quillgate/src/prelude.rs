//! Common imports for most quillgate applications.

pub use crate::{
    assistant_message, attachment, build_runtime, build_runtime_with, build_runtime_with_state,
    in_memory_state, instructed_turn, session, user_message,
};
pub use crate::{
    AssistantService, BoxFuture, ChatError, ChatErrorKind, ChunkStream, ConversationSession,
    CredentialHealth, CredentialSecret, FileRef, FinishReason, GenerateError, GenerateErrorKind,
    GenerateTransport, GenerationOptions, HttpGenerateTransport, InMemorySessionStore,
    InMemoryStateStore, KvSessionStore, Message, MetadataMap, PoolCoordinator, PoolError,
    PoolErrorKind, PoolHandle, ResponseClient, Role, RuntimeBundle, SessionId, SessionStore,
    StateStore, StoredMessage, TurnEvent, TurnEventStream, TurnOptions, TurnResult,
    spawn_idle_cleanup,
};
