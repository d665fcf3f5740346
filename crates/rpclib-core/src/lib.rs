//! # rpclib-core - Binary Object Codec
//!
//! Foundation crate for the gfxtrace client. Provides the schema-typed wire
//! codec, the type registry, dynamically typed values, error handling and
//! logging setup. Has no internal dependencies.
//!
//! ## Public API
//!
//! ### Codec (`binary`)
//! - [`BinaryId`] - 20-byte type identifier derived from a type's signature
//! - [`BinaryObject`], [`TypedObject`] - Per-type encode/decode contract
//! - [`BinaryClass`] - Type metadata and factory used for decoding
//! - [`Namespace`] - Registry resolving ids back to classes
//! - [`Encoder`], [`Decoder`] - Little-endian primitive streams
//! - [`binary_object!`] - Declares a wire struct and its codec
//!
//! ### Variants (`any`)
//! - [`Value`] - Decoded "any" field
//! - [`any::Box`] - Wire holder for a [`Value`]
//! - [`FromValue`] - Checked conversion out of a [`Value`]
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Error enum with `fatal` vs `recoverable` classification
//! - [`RemoteError`] - Domain errors reported by the server
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//! - [`ResultExt`] - Extension trait for adding error context
//!
//! ## Prelude
//!
//! ```rust
//! use rpclib_core::prelude::*;
//! ```

pub mod any;
pub mod binary;
pub mod error;
pub mod logging;

/// Prelude for common imports used throughout the gfxtrace crates
pub mod prelude {
    pub use super::error::{Error, Result, ResultExt};
    pub use tracing::{debug, error, info, instrument, trace, warn};
}

pub use any::{FromValue, Value};
pub use binary::{
    decode_object, encode_object, BinaryClass, BinaryId, BinaryObject, Decoder, Encoder, Field,
    Namespace, Object, TypedObject,
};
pub use error::{Error, RemoteError, Result, ResultExt};
