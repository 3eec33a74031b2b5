//! # Error Types
//!
//! Error handling for the codec and the adapter registry.
//!
//! This module defines every error variant that can occur while moving values
//! across the byte boundary (Writer/Reader) or across the object boundary
//! (Serializer/Deserializer).
//!
//! ## Error Categories
//! - **Stream Errors**: truncated input, inconsistent lengths, bad cache references
//! - **Registry Errors**: unresolved adapters, unknown discriminators, adapter failures
//! - **Binder Errors**: missing or mistyped fields read by adapters
//! - **Configuration Errors**: invalid or unreadable configuration
//!
//! Every fatal kind aborts the current encode/decode call. There is no
//! partial-result mode: a caller gets either a fully formed value or an error.
//!
//! ## Example Usage
//! ```rust
//! use boss_codec::error::{CodecError, Result};
//! use boss_codec::load;
//! use tracing::{error, info};
//!
//! fn first_value(data: &[u8]) -> Result<String> {
//!     let value = load(data)?;
//!     value
//!         .as_str()
//!         .map(str::to_owned)
//!         .ok_or_else(|| CodecError::InvalidValue("expected text".to_string()))
//! }
//!
//! fn main() {
//!     match first_value(&[0x2B, b'H', b'e', b'l', b'l', b'o']) {
//!         Ok(text) => info!(text, "Decoded text"),
//!         Err(e) => error!(error=%e, "Decode failed"),
//!     }
//! }
//! ```

use std::error::Error as StdError;
use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
pub mod constants {
    /// Registry lock messages
    pub const ERR_MAPPER_WRITE_LOCK: &str = "Failed to acquire write lock on mapper";

    /// Stream structure messages
    pub const ERR_EOF_IN_HEADER: &str = "Unexpected end of input in header";
    pub const ERR_EOF_IN_PAYLOAD: &str = "Unexpected end of input in payload";
    pub const ERR_EOF_IN_VARINT: &str = "Unexpected end of input in length varint";
    pub const ERR_VARINT_OVERFLOW: &str = "Length varint does not fit in 64 bits";
    pub const ERR_INVALID_UTF8: &str = "Text payload is not valid UTF-8";
    pub const ERR_NON_TEXT_KEY: &str = "Dictionary key is not text";
    pub const ERR_BIG_LENGTH: &str = "Declared length does not fit in memory";
    pub const ERR_NESTED_STREAM_MODE: &str = "Stream mode marker inside a container";

    /// Value messages
    pub const ERR_OBJECT_NOT_SERIALIZED: &str =
        "Typed object reached the writer without passing through a serializer";
    pub const ERR_NEGATIVE_TIMESTAMP: &str = "Timestamps before the epoch cannot be encoded";
    pub const ERR_SUBSECOND_TIMESTAMP: &str =
        "Timestamps carry whole seconds; truncate before encoding";

    /// Session messages
    pub const ERR_MISSING_CONTEXT: &str = "No deserialization context is set";
}

/// Boxed cause carried by [`CodecError::AdapterFailure`].
pub type BoxedCause = Box<dyn StdError + Send + Sync + 'static>;

/// CodecError is the primary error type for all encode/decode operations
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Malformed stream: {0}")]
    MalformedStream(String),

    #[error("Unknown extra code: {0}")]
    UnknownExtraCode(u64),

    #[error("No adapter registered for type: {0}")]
    UnresolvedAdapter(String),

    #[error("No adapter registered for discriminator: {0}")]
    UnknownDiscriminator(String),

    #[error("Invalid cache reference {index} (cache holds {available} entries)")]
    InvalidCacheReference { index: u64, available: usize },

    #[error("Adapter '{adapter}' failed: {source}")]
    AdapterFailure {
        adapter: String,
        #[source]
        source: BoxedCause,
    },

    #[error("Missing field: {0}")]
    MissingField(String),

    #[error("Invalid field '{field}': expected {expected}")]
    InvalidField { field: String, expected: &'static str },

    #[error("{}", constants::ERR_MISSING_CONTEXT)]
    MissingContext,

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Lock poisoned: {0}")]
    LockPoisoned(&'static str),
}

impl CodecError {
    /// Wrap an arbitrary cause raised inside an adapter.
    pub fn adapter_failure(adapter: impl Into<String>, source: impl Into<BoxedCause>) -> Self {
        CodecError::AdapterFailure {
            adapter: adapter.into(),
            source: source.into(),
        }
    }

    /// Whether the error aborts the current decode call.
    ///
    /// Only [`CodecError::UnknownDiscriminator`] is recoverable: the default
    /// deserializer degrades to the plain map instead of raising it.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, CodecError::UnknownDiscriminator(_))
    }
}

/// Type alias for Results using CodecError
pub type Result<T> = std::result::Result<T, CodecError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adapter_failure_keeps_cause() {
        let err = CodecError::adapter_failure("point", "x is missing");
        assert_eq!(err.to_string(), "Adapter 'point' failed: x is missing");
        assert!(err.source().is_some());
    }

    #[test]
    fn test_only_unknown_discriminator_is_recoverable() {
        assert!(!CodecError::UnknownDiscriminator("x".into()).is_fatal());
        assert!(CodecError::UnknownExtraCode(3).is_fatal());
        assert!(CodecError::MissingContext.is_fatal());
    }

    #[test]
    fn test_missing_context_message() {
        assert_eq!(
            CodecError::MissingContext.to_string(),
            constants::ERR_MISSING_CONTEXT
        );
    }

    #[test]
    fn test_io_conversion() {
        let io_err = io::Error::new(io::ErrorKind::UnexpectedEof, "eof");
        let err: CodecError = io_err.into();
        assert!(matches!(err, CodecError::Io(_)));
    }
}
