//! Schema-typed binary object codec.
//!
//! - [`BinaryId`]: 20-byte type identifier
//! - [`BinaryObject`] / [`BinaryClass`]: per-type codec contract
//! - [`Namespace`]: id to class registry
//! - [`Encoder`] / [`Decoder`]: little-endian primitive streams
//! - [`Field`]: in-place encoding of struct fields

mod decoder;
mod encoder;
mod field;
mod id;
mod macros;
mod namespace;
mod object;

pub use decoder::{decode_object, Decoder, MAX_OBJECT_DEPTH};
pub use encoder::{encode_object, Encoder};
pub use field::Field;
pub use id::{BinaryId, ID_SIZE};
pub use namespace::Namespace;
pub use object::{BinaryClass, BinaryObject, Object, TypedObject};
