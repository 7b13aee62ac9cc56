//! Conversation session state and per-turn value types.

use std::pin::Pin;
use std::time::SystemTime;

use futures_core::Stream;
use qcommon::{GenerationOptions, MetadataMap, SessionId};
use qprovider::{FileRef, FinishReason, Message, Role};

use crate::ChatError;

/// One persisted message of a conversation transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    pub role: Role,
    pub text: String,
    pub timestamp: SystemTime,
}

impl StoredMessage {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            timestamp: SystemTime::now(),
        }
    }
}

/// A conversation bound to one credential slot for its whole lifetime,
/// rebound only when that credential fails a turn. Metadata is attached at
/// creation and folded into every request built from the session.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationSession {
    pub id: SessionId,
    pub bound_credential: usize,
    pub messages: Vec<StoredMessage>,
    pub metadata: MetadataMap,
}

impl ConversationSession {
    pub fn new(id: SessionId, bound_credential: usize) -> Self {
        Self {
            id,
            bound_credential,
            messages: Vec::new(),
            metadata: MetadataMap::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: MetadataMap) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn append_user(&mut self, text: impl Into<String>) {
        self.messages.push(StoredMessage::new(Role::User, text));
    }

    pub fn append_assistant(&mut self, text: impl Into<String>) {
        self.messages.push(StoredMessage::new(Role::Assistant, text));
    }

    /// Timestamp of the most recent message, if any.
    pub fn last_activity(&self) -> Option<SystemTime> {
        self.messages.last().map(|message| message.timestamp)
    }

    /// The transcript as provider messages, oldest first.
    pub fn history(&self) -> Vec<Message> {
        self.messages
            .iter()
            .map(|message| Message::new(message.role, message.text.clone()))
            .collect()
    }
}

/// Per-turn request settings. Session metadata is not set here; it travels
/// with the session itself.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TurnOptions {
    pub generation: GenerationOptions,
    pub system_instruction: Option<String>,
    pub files: Vec<FileRef>,
}

impl TurnOptions {
    pub fn with_generation(mut self, generation: GenerationOptions) -> Self {
        self.generation = generation;
        self
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    pub fn with_files(mut self, files: Vec<FileRef>) -> Self {
        self.files = files;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnResult {
    pub session_id: SessionId,
    pub text: String,
    pub finish_reason: FinishReason,
}

/// Events of one streamed turn: zero or more text deltas, then exactly one
/// completion carrying the assembled reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnEvent {
    Delta(String),
    Completed(TurnResult),
}

pub type TurnEventStream<'a> =
    Pin<Box<dyn Stream<Item = Result<TurnEvent, ChatError>> + Send + 'a>>;
