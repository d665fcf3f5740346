//! Per-field wire encoding.
//!
//! Every type that can sit in a field of a [`binary_object!`](crate::binary_object)
//! struct implements [`Field`]. The signature strings feed the type id, so
//! changing one changes the id of every struct that contains it.

use bytes::Bytes;

use super::{BinaryId, Decoder, Encoder, Object};
use crate::any::Value;
use crate::error::Result;

/// A value that is encoded in place, without a type id of its own.
pub trait Field: Sized {
    /// Short name contributed to the enclosing type's signature.
    fn signature() -> String;

    fn encode_field(&self, e: &mut Encoder<'_>) -> Result<()>;

    fn decode_field(d: &mut Decoder<'_>) -> Result<Self>;
}

macro_rules! primitive_field {
    ($($ty:ty => $method:ident),* $(,)?) => {
        $(
            impl Field for $ty {
                fn signature() -> String {
                    stringify!($method).to_string()
                }

                fn encode_field(&self, e: &mut Encoder<'_>) -> Result<()> {
                    e.$method(*self);
                    Ok(())
                }

                fn decode_field(d: &mut Decoder<'_>) -> Result<Self> {
                    d.$method()
                }
            }
        )*
    };
}

primitive_field! {
    bool => bool,
    u8 => u8,
    i8 => i8,
    u16 => u16,
    i16 => i16,
    u32 => u32,
    i32 => i32,
    u64 => u64,
    i64 => i64,
    f32 => f32,
    f64 => f64,
}

impl Field for String {
    fn signature() -> String {
        "string".to_string()
    }

    fn encode_field(&self, e: &mut Encoder<'_>) -> Result<()> {
        e.string(self)
    }

    fn decode_field(d: &mut Decoder<'_>) -> Result<Self> {
        d.string()
    }
}

impl Field for Bytes {
    fn signature() -> String {
        "bytes".to_string()
    }

    fn encode_field(&self, e: &mut Encoder<'_>) -> Result<()> {
        e.bytes(self)
    }

    fn decode_field(d: &mut Decoder<'_>) -> Result<Self> {
        d.bytes()
    }
}

impl Field for BinaryId {
    fn signature() -> String {
        "id".to_string()
    }

    fn encode_field(&self, e: &mut Encoder<'_>) -> Result<()> {
        e.id(self);
        Ok(())
    }

    fn decode_field(d: &mut Decoder<'_>) -> Result<Self> {
        d.id()
    }
}

impl<T: Field> Field for Vec<T> {
    fn signature() -> String {
        format!("[]{}", T::signature())
    }

    fn encode_field(&self, e: &mut Encoder<'_>) -> Result<()> {
        e.count(self.len())?;
        for item in self {
            item.encode_field(e)?;
        }
        Ok(())
    }

    fn decode_field(d: &mut Decoder<'_>) -> Result<Self> {
        let count = d.count()?;
        let mut items = Vec::with_capacity(d.capacity_hint(count));
        for _ in 0..count {
            items.push(T::decode_field(d)?);
        }
        Ok(items)
    }
}

impl Field for Object {
    fn signature() -> String {
        "object".to_string()
    }

    fn encode_field(&self, e: &mut Encoder<'_>) -> Result<()> {
        e.object(self)
    }

    fn decode_field(d: &mut Decoder<'_>) -> Result<Self> {
        d.object()
    }
}

impl Field for Value {
    fn signature() -> String {
        "any".to_string()
    }

    fn encode_field(&self, e: &mut Encoder<'_>) -> Result<()> {
        e.variant(self)
    }

    fn decode_field(d: &mut Decoder<'_>) -> Result<Self> {
        d.variant()
    }
}
