//! Shared utilities and strongly-typed common values for workspace crates.
//!
//! ```rust
//! use qcommon::{GenerationOptions, MetadataMap, SessionId};
//!
//! let session = SessionId::from("thread-417");
//! let mut metadata = MetadataMap::new();
//! metadata.insert("client_name".to_string(), "acme".to_string());
//!
//! let options = GenerationOptions::default().with_temperature(0.3).with_top_k(16);
//! assert_eq!(session.as_str(), "thread-417");
//! assert_eq!(options.top_k, Some(16));
//! ```

pub mod future {
    //! Shared async future aliases.
    //!
    //! ```rust
    //! use qcommon::BoxFuture;
    //!
    //! fn str_len<'a>(value: &'a str) -> BoxFuture<'a, usize> {
    //!     Box::pin(async move { value.len() })
    //! }
    //!
    //! let _future = str_len("hello");
    //! ```

    use std::future::Future;
    use std::pin::Pin;

    pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
}

pub mod context {
    //! Shared metadata and cross-crate identifier newtypes.
    //!
    //! ```rust
    //! use qcommon::{MetadataMap, SessionId};
    //!
    //! let session = SessionId::new("thread-42");
    //! let mut metadata = MetadataMap::new();
    //! metadata.insert("job_title".to_string(), "logo design".to_string());
    //!
    //! assert_eq!(session.to_string(), "thread-42");
    //! ```

    use std::collections::HashMap;
    use std::fmt::{Display, Formatter};

    pub type MetadataMap = HashMap<String, String>;

    /// Identifier for one conversation, derived from a stable external key
    /// such as a marketplace message-thread id.
    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    pub struct SessionId(String);

    impl SessionId {
        pub fn new(value: impl Into<String>) -> Self {
            Self(value.into())
        }

        pub fn as_str(&self) -> &str {
            self.0.as_str()
        }
    }

    impl Display for SessionId {
        fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
            f.write_str(&self.0)
        }
    }

    impl From<String> for SessionId {
        fn from(value: String) -> Self {
            Self(value)
        }
    }

    impl From<&str> for SessionId {
        fn from(value: &str) -> Self {
            Self(value.to_string())
        }
    }
}

pub mod model {
    //! Shared generation settings used by request types.
    //!
    //! ```rust
    //! use qcommon::GenerationOptions;
    //!
    //! let options = GenerationOptions::default()
    //!     .with_temperature(0.2)
    //!     .with_top_p(0.9)
    //!     .with_max_output_tokens(128);
    //!
    //! assert_eq!(options.temperature, Some(0.2));
    //! assert_eq!(options.max_output_tokens, Some(128));
    //! ```

    /// Sampling and length knobs. Unset fields fall back to the request
    /// builder's defaults when the payload is assembled.
    #[derive(Debug, Clone, Copy, PartialEq, Default)]
    pub struct GenerationOptions {
        pub temperature: Option<f32>,
        pub top_k: Option<u32>,
        pub top_p: Option<f32>,
        pub max_output_tokens: Option<u32>,
    }

    impl GenerationOptions {
        pub fn with_temperature(mut self, temperature: f32) -> Self {
            self.temperature = Some(temperature);
            self
        }

        pub fn with_top_k(mut self, top_k: u32) -> Self {
            self.top_k = Some(top_k);
            self
        }

        pub fn with_top_p(mut self, top_p: f32) -> Self {
            self.top_p = Some(top_p);
            self
        }

        pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
            self.max_output_tokens = Some(max_output_tokens);
            self
        }
    }
}

pub use context::{MetadataMap, SessionId};
pub use future::BoxFuture;
pub use model::GenerationOptions;

#[cfg(test)]
mod tests {
    use super::{GenerationOptions, SessionId};

    #[test]
    fn session_id_round_trips_strings() {
        let session = SessionId::new("thread-1");

        assert_eq!(session.as_str(), "thread-1");
        assert_eq!(session.to_string(), "thread-1");
        assert_eq!(SessionId::from("thread-1"), session);
    }

    #[test]
    fn generation_options_builder_helpers_set_values() {
        let options = GenerationOptions::default()
            .with_temperature(0.3)
            .with_top_k(40)
            .with_top_p(0.95)
            .with_max_output_tokens(123);

        assert_eq!(options.temperature, Some(0.3));
        assert_eq!(options.top_k, Some(40));
        assert_eq!(options.top_p, Some(0.95));
        assert_eq!(options.max_output_tokens, Some(123));
    }

    #[test]
    fn generation_options_default_leaves_everything_unset() {
        let options = GenerationOptions::default();

        assert_eq!(options.temperature, None);
        assert_eq!(options.top_k, None);
        assert_eq!(options.top_p, None);
        assert_eq!(options.max_output_tokens, None);
    }
}
