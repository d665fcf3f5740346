//! Error types shared by the codec, transport and service layers

use std::panic::Location;
use std::time::Duration;

use thiserror::Error;

use crate::binary::BinaryId;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors organized by the layer that raises them
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Common/Infrastructure Errors
    // ─────────────────────────────────────────────────────────────
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid configuration: {message}")]
    ConfigInvalid { message: String },

    // ─────────────────────────────────────────────────────────────
    // Codec Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Unexpected end of data: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof { needed: usize, remaining: usize },

    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    #[error("Unknown type id {id}: not registered in namespace")]
    UnknownType { id: BinaryId },

    #[error("Type {name} ({id}) is not registered and cannot be encoded")]
    Unregistered { name: &'static str, id: BinaryId },

    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    // ─────────────────────────────────────────────────────────────
    // Registry Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Registry conflict for {id}: {existing} already registered, refusing {incoming}")]
    RegistryConflict {
        id: BinaryId,
        existing: &'static str,
        incoming: &'static str,
    },

    // ─────────────────────────────────────────────────────────────
    // Transport Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Transport error: {message}")]
    Transport { message: String },

    #[error("Protocol error: {message}")]
    Protocol { message: String },

    #[error("Channel closed unexpectedly")]
    ChannelClosed,

    // ─────────────────────────────────────────────────────────────
    // Server-reported Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Server error: {0}")]
    Remote(#[from] RemoteError),

    // ─────────────────────────────────────────────────────────────
    // Call Lifecycle
    // ─────────────────────────────────────────────────────────────
    #[error("{method} (called at {location}) failed: {source}")]
    Call {
        method: &'static str,
        location: &'static Location<'static>,
        #[source]
        source: Box<Error>,
    },

    #[error("{method} timed out after {after:?}")]
    Timeout {
        method: &'static str,
        after: Duration,
    },

    #[error("Call was cancelled")]
    Cancelled,
}

/// Domain errors reported by the server in place of a result object.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RemoteError {
    #[error("data unavailable: {reason} (transient: {transient})")]
    DataUnavailable { reason: String, transient: bool },

    #[error("invalid path {path}: {reason}")]
    InvalidPath { reason: String, path: String },

    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    #[error("{message}")]
    Rpc { message: String },
}

// ─────────────────────────────────────────────────────────────────
// Convenience Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            message: message.into(),
        }
    }

    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    pub fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Attach the call site of an RPC method to an error raised while the
    /// call was in flight on another task.
    pub fn at_call_site(self, method: &'static str, location: &'static Location<'static>) -> Self {
        match self {
            // Cancellation stays unwrapped.
            Error::Cancelled => Error::Cancelled,
            other => Self::Call {
                method,
                location,
                source: Box::new(other),
            },
        }
    }

    /// The underlying error with any call-site wrappers removed.
    pub fn root(&self) -> &Error {
        match self {
            Error::Call { source, .. } => source.root(),
            other => other,
        }
    }

    /// Errors meaning sender and receiver schemas have diverged; retrying
    /// the same request can never succeed.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.root(),
            Error::UnknownType { .. }
                | Error::Unregistered { .. }
                | Error::RegistryConflict { .. }
                | Error::Protocol { .. }
        )
    }

    /// Check if this is a recoverable error
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.root(),
            Error::Transport { .. }
                | Error::ChannelClosed
                | Error::Timeout { .. }
                | Error::Remote(_)
                | Error::Cancelled
        )
    }

    /// Whether the same request may succeed if issued again later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.root(),
            Error::Remote(RemoteError::DataUnavailable {
                transient: true,
                ..
            }) | Error::Timeout { .. }
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.root(), Error::Cancelled)
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Context Extensions
// ─────────────────────────────────────────────────────────────────

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", context.into(), err);
            err
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", f(), err);
            err
        })
    }
}
