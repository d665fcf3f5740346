//! Dynamically typed values for "any" fields.
//!
//! A [`Value`] is either a primitive, a registered object, or null. On the
//! wire every non-null value is a tagged object; primitives travel inside
//! small builtin box structs so the receiver can tell an `i32` from a `u32`.

use std::boxed::Box as StdBox;

use bytes::Bytes;

use crate::binary::{BinaryId, BinaryObject, Decoder, Encoder, Namespace, Object, TypedObject};
use crate::binary_object;
use crate::error::{Error, Result};

/// A decoded "any" field.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int32(i32),
    Uint32(u32),
    Int64(i64),
    Uint64(u64),
    Float32(f32),
    Float64(f64),
    String(String),
    Bytes(Bytes),
    Object(StdBox<dyn BinaryObject>),
}

impl Value {
    /// Wrap a concrete object.
    pub fn object<T: BinaryObject>(obj: T) -> Self {
        Value::Object(StdBox::new(obj))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short description used in mismatch errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int32(_) => "int32",
            Value::Uint32(_) => "uint32",
            Value::Int64(_) => "int64",
            Value::Uint64(_) => "uint64",
            Value::Float32(_) => "float32",
            Value::Float64(_) => "float64",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Object(obj) => obj.class().name(),
        }
    }

    pub fn as_object(&self) -> Option<&dyn BinaryObject> {
        match self {
            Value::Object(obj) => Some(obj.as_ref()),
            _ => None,
        }
    }

    /// Take the value as a specific object type.
    pub fn into_object<T: TypedObject>(self) -> Result<T> {
        match self {
            Value::Object(obj) => obj.downcast::<T>().map(|boxed| *boxed),
            other => Err(Error::type_mismatch(
                T::binary_class().name(),
                other.type_name(),
            )),
        }
    }

    /// The object that carries this value on the wire.
    pub fn into_boxed(self) -> Object {
        let boxed: StdBox<dyn BinaryObject> = match self {
            Value::Null => return None,
            Value::Bool(value) => StdBox::new(BoolBox { value }),
            Value::Int32(value) => StdBox::new(Int32Box { value }),
            Value::Uint32(value) => StdBox::new(Uint32Box { value }),
            Value::Int64(value) => StdBox::new(Int64Box { value }),
            Value::Uint64(value) => StdBox::new(Uint64Box { value }),
            Value::Float32(value) => StdBox::new(Float32Box { value }),
            Value::Float64(value) => StdBox::new(Float64Box { value }),
            Value::String(value) => StdBox::new(StringBox { value }),
            Value::Bytes(value) => StdBox::new(BytesBox { value }),
            Value::Object(obj) => obj,
        };
        Some(boxed)
    }

    /// Inverse of [`Value::into_boxed`]: builtin boxes become primitives,
    /// anything else stays an object.
    pub fn from_boxed(obj: StdBox<dyn BinaryObject>) -> Self {
        if let Some(b) = obj.downcast_ref::<BoolBox>() {
            return Value::Bool(b.value);
        }
        if let Some(b) = obj.downcast_ref::<Int32Box>() {
            return Value::Int32(b.value);
        }
        if let Some(b) = obj.downcast_ref::<Uint32Box>() {
            return Value::Uint32(b.value);
        }
        if let Some(b) = obj.downcast_ref::<Int64Box>() {
            return Value::Int64(b.value);
        }
        if let Some(b) = obj.downcast_ref::<Uint64Box>() {
            return Value::Uint64(b.value);
        }
        if let Some(b) = obj.downcast_ref::<Float32Box>() {
            return Value::Float32(b.value);
        }
        if let Some(b) = obj.downcast_ref::<Float64Box>() {
            return Value::Float64(b.value);
        }
        if let Some(b) = obj.downcast_ref::<StringBox>() {
            return Value::String(b.value.clone());
        }
        if let Some(b) = obj.downcast_ref::<BytesBox>() {
            return Value::Bytes(b.value.clone());
        }
        Value::Object(obj)
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

value_from! {
    bool => Bool,
    i32 => Int32,
    u32 => Uint32,
    i64 => Int64,
    u64 => Uint64,
    f32 => Float32,
    f64 => Float64,
    String => String,
    Bytes => Bytes,
    StdBox<dyn BinaryObject> => Object,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

// ─────────────────────────────────────────────────────────────────
// Builtin boxes
// ─────────────────────────────────────────────────────────────────

binary_object! {
    pub struct BoolBox("any.bool") {
        pub value: bool,
    }
}

binary_object! {
    pub struct Int32Box("any.int32") {
        pub value: i32,
    }
}

binary_object! {
    pub struct Uint32Box("any.uint32") {
        pub value: u32,
    }
}

binary_object! {
    pub struct Int64Box("any.int64") {
        pub value: i64,
    }
}

binary_object! {
    pub struct Uint64Box("any.uint64") {
        pub value: u64,
    }
}

binary_object! {
    pub struct Float32Box("any.float32") {
        pub value: f32,
    }
}

binary_object! {
    pub struct Float64Box("any.float64") {
        pub value: f64,
    }
}

binary_object! {
    pub struct StringBox("any.string") {
        pub value: String,
    }
}

binary_object! {
    pub struct BytesBox("any.bytes") {
        pub value: Bytes,
    }
}

/// Register every builtin box with `namespace`.
pub fn register_builtins(namespace: &Namespace) -> Result<()> {
    namespace.add::<BoolBox>()?;
    namespace.add::<Int32Box>()?;
    namespace.add::<Uint32Box>()?;
    namespace.add::<Int64Box>()?;
    namespace.add::<Uint64Box>()?;
    namespace.add::<Float32Box>()?;
    namespace.add::<Float64Box>()?;
    namespace.add::<StringBox>()?;
    namespace.add::<BytesBox>()?;
    Ok(())
}

// ─────────────────────────────────────────────────────────────────
// Variant box
// ─────────────────────────────────────────────────────────────────

/// Transient holder pairing a value with the id it is written under.
///
/// Only exists at the encode/decode boundary of an "any" field; the
/// enclosing struct stores the plain [`Value`].
#[derive(Debug, Clone, PartialEq)]
pub struct Box {
    object: Object,
}

impl Box {
    pub fn wrap(value: Value) -> Self {
        Self {
            object: value.into_boxed(),
        }
    }

    /// Id of the held object, [`BinaryId::ZERO`] when empty.
    pub fn id(&self) -> BinaryId {
        self.object
            .as_ref()
            .map_or(BinaryId::ZERO, |obj| obj.class().id())
    }

    pub fn object(&self) -> Option<&dyn BinaryObject> {
        self.object.as_deref()
    }

    pub fn unwrap(self) -> Value {
        match self.object {
            None => Value::Null,
            Some(obj) => Value::from_boxed(obj),
        }
    }

    pub fn encode(&self, e: &mut Encoder<'_>) -> Result<()> {
        e.object(&self.object)
    }

    pub fn decode(d: &mut Decoder<'_>) -> Result<Self> {
        Ok(Self { object: d.object()? })
    }
}

// ─────────────────────────────────────────────────────────────────
// Conversion out of a Value
// ─────────────────────────────────────────────────────────────────

/// Checked conversion from a decoded [`Value`] to the type a caller
/// expects.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self>;
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self> {
        Ok(value)
    }
}

impl FromValue for Object {
    fn from_value(value: Value) -> Result<Self> {
        Ok(value.into_boxed())
    }
}

macro_rules! from_value {
    ($($ty:ty => $expected:literal: $($variant:ident)|+),* $(,)?) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: Value) -> Result<Self> {
                    match value {
                        $(Value::$variant(v) => Ok(v.into()),)+
                        other => Err(Error::type_mismatch($expected, other.type_name())),
                    }
                }
            }
        )*
    };
}

from_value! {
    bool => "bool": Bool,
    i32 => "int32": Int32,
    u32 => "uint32": Uint32,
    i64 => "int64": Int64 | Int32,
    u64 => "uint64": Uint64 | Uint32,
    f32 => "float32": Float32,
    f64 => "float64": Float64 | Float32,
    String => "string": String,
    Bytes => "bytes": Bytes,
}
