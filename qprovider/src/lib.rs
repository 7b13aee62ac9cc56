//! Request construction, provider transport, and resilient stream decoding.

mod builder;
mod client;
mod decode;
mod error;
mod model;
mod transport;
pub mod wire;

pub mod prelude {
    pub use crate::{
        BuildOptions, Chunk, ChunkStream, Content, FileRef, FinishReason, GenerateError,
        GenerateErrorKind, GenerateReply, GenerateTransport, HttpGenerateTransport, LineDecoder,
        Message, Part, PromptInput, RequestPayload, ResolvedOptions, ResponseClient, Role,
        build_request, classify_failure,
    };
    pub use qcommon::{GenerationOptions, MetadataMap};
}

pub use builder::{
    BuildOptions, Content, DEFAULT_MAX_OUTPUT_TOKENS, DEFAULT_TEMPERATURE, DEFAULT_TOP_K,
    DEFAULT_TOP_P, FileRef, Part, PromptInput, RequestPayload, ResolvedOptions, build_request,
};
pub use client::{ChunkStream, ResponseClient};
pub use decode::{EVENT_PREFIX, LineDecoder, decode_record, event_payload};
pub use error::{GenerateError, GenerateErrorKind, classify_failure};
pub use model::{Chunk, FinishReason, GenerateReply, Message, Role};
pub use transport::{ByteStream, GenerateTransport, HttpGenerateTransport, ProviderFuture};
