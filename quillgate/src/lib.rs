//! Unified facade over the quillgate workspace crates.
//!
//! This crate is designed to be the single dependency for most applications.
//! It re-exports the core quillgate crates and provides convenience wiring
//! for the usual credential-pool-plus-assistant setup.

pub mod prelude;
pub mod runtime;
pub mod util;

pub use qchat;
pub use qcommon;
pub use qpool;
pub use qprovider;

pub use qchat::{
    AssistantService, ChatError, ChatErrorKind, ConversationSession, InMemorySessionStore,
    KvSessionStore, SessionStore, StoredMessage, TurnEvent, TurnEventStream, TurnOptions,
    TurnResult, spawn_idle_cleanup,
};
pub use qcommon::{BoxFuture, GenerationOptions, MetadataMap, SessionId};
pub use qpool::{
    CredentialHealth, CredentialOutcome, CredentialPool, CredentialSecret, FailureClass,
    InMemoryStateStore, PoolCache, PoolCommand, PoolCoordinator, PoolError, PoolErrorKind,
    PoolHandle, SelectedCredential, StateStore,
};
pub use qprovider::{
    BuildOptions, ByteStream, Chunk, ChunkStream, Content, FileRef, FinishReason, GenerateError,
    GenerateErrorKind, GenerateReply, GenerateTransport, HttpGenerateTransport, LineDecoder,
    Message, Part, PromptInput, ProviderFuture, RequestPayload, ResolvedOptions, ResponseClient,
    Role, build_request, classify_failure,
};

pub use runtime::{
    RuntimeBundle, build_runtime, build_runtime_with, build_runtime_with_state, in_memory_state,
};
pub use util::{assistant_message, attachment, instructed_turn, session, user_message};
