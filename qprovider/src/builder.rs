//! Pure request construction from prompt text or message history.
//!
//! ```rust
//! use qprovider::{BuildOptions, PromptInput, build_request};
//!
//! let payload = build_request(
//!     PromptInput::Text("draft a polite follow-up".to_string()),
//!     BuildOptions::default(),
//! );
//! assert_eq!(payload.contents.len(), 1);
//! assert_eq!(payload.options.temperature, 0.7);
//! ```

use qcommon::{GenerationOptions, MetadataMap};

use crate::{Message, Role};

pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_TOP_K: u32 = 40;
pub const DEFAULT_TOP_P: f32 = 0.95;
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 2048;

/// A logical attachment. `handle` is the remote file handle produced by the
/// upstream resolution service; references that were never resolved carry
/// `None` and are dropped at build time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRef {
    pub name: String,
    pub handle: Option<String>,
    pub mime_type: String,
}

impl FileRef {
    pub fn resolved(
        name: impl Into<String>,
        handle: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            handle: Some(handle.into()),
            mime_type: mime_type.into(),
        }
    }

    pub fn unresolved(name: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handle: None,
            mime_type: mime_type.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PromptInput {
    Text(String),
    History(Vec<Message>),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BuildOptions {
    pub generation: GenerationOptions,
    pub system_instruction: Option<String>,
    pub files: Vec<FileRef>,
    pub context: MetadataMap,
}

impl BuildOptions {
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

    pub fn with_context(mut self, context: MetadataMap) -> Self {
        self.context = context;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    File { uri: String, mime_type: String },
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Content {
    pub role: Role,
    pub parts: Vec<Part>,
}

/// Generation settings with every default applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedOptions {
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
}

impl Default for ResolvedOptions {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            top_k: DEFAULT_TOP_K,
            top_p: DEFAULT_TOP_P,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
        }
    }
}

impl From<GenerationOptions> for ResolvedOptions {
    fn from(options: GenerationOptions) -> Self {
        Self {
            temperature: options.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            top_k: options.top_k.unwrap_or(DEFAULT_TOP_K),
            top_p: options.top_p.unwrap_or(DEFAULT_TOP_P),
            max_output_tokens: options
                .max_output_tokens
                .unwrap_or(DEFAULT_MAX_OUTPUT_TOKENS),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RequestPayload {
    pub contents: Vec<Content>,
    pub system_instruction: Option<String>,
    pub options: ResolvedOptions,
}

/// Builds a provider-agnostic payload. No I/O, no shared state.
///
/// A single string becomes one user turn; a history passes through with one
/// content per message, roles preserved. Resolved file references become
/// parts placed before the text of the final user turn; unresolved ones are
/// dropped and logged.
pub fn build_request(input: PromptInput, options: BuildOptions) -> RequestPayload {
    let resolved_options = ResolvedOptions::from(options.generation);
    let file_parts = resolve_file_parts(options.files);
    let system_instruction =
        compose_system_instruction(options.system_instruction, &options.context);

    let mut contents = match input {
        PromptInput::Text(text) => vec![Content {
            role: Role::User,
            parts: vec![Part::Text(text)],
        }],
        PromptInput::History(messages) => messages
            .into_iter()
            .map(|message| Content {
                role: message.role,
                parts: vec![Part::Text(message.text)],
            })
            .collect(),
    };

    if !file_parts.is_empty() {
        match contents.last_mut() {
            Some(last) if last.role == Role::User => {
                last.parts.splice(0..0, file_parts);
            }
            _ => {
                tracing::warn!(
                    count = file_parts.len(),
                    "dropping file references, request has no trailing user turn"
                );
            }
        }
    }

    RequestPayload {
        contents,
        system_instruction,
        options: resolved_options,
    }
}

fn resolve_file_parts(files: Vec<FileRef>) -> Vec<Part> {
    files
        .into_iter()
        .filter_map(|file| match file.handle {
            Some(uri) => Some(Part::File {
                uri,
                mime_type: file.mime_type,
            }),
            None => {
                tracing::warn!(name = %file.name, "dropping file reference without a resolved handle");
                None
            }
        })
        .collect()
}

/// Folds scraped conversation context into the system instruction, one
/// `key: value` line per entry, keys sorted for a stable prompt.
fn compose_system_instruction(
    instruction: Option<String>,
    context: &MetadataMap,
) -> Option<String> {
    if context.is_empty() {
        return instruction;
    }

    let mut keys: Vec<&String> = context.keys().collect();
    keys.sort();

    let mut composed = instruction.unwrap_or_default();
    if !composed.is_empty() {
        composed.push_str("\n\n");
    }

    composed.push_str("Conversation context:");
    for key in keys {
        composed.push('\n');
        composed.push_str(key);
        composed.push_str(": ");
        composed.push_str(&context[key]);
    }

    Some(composed)
}
