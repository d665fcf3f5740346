//! The codec contract every wire type implements.

use std::any::{Any, TypeId};
use std::fmt;

use super::{BinaryId, Decoder, Encoder};
use crate::error::{Error, Result};

/// Nullable polymorphic field: encoded as id + payload, or [`BinaryId::ZERO`]
/// for `None`.
pub type Object = Option<Box<dyn BinaryObject>>;

/// Describes one concrete wire type: its id, its wire name and how to
/// create a blank instance for decoding.
pub struct BinaryClass {
    name: &'static str,
    signature: String,
    id: BinaryId,
    type_id: TypeId,
    create: fn() -> Box<dyn BinaryObject>,
}

impl BinaryClass {
    /// Build the class for `T` from its wire name and ordered field
    /// signatures. The id is the hash of the resulting signature.
    pub fn new<T: TypedObject>(name: &'static str, fields: &[(&str, String)]) -> Self {
        let body = fields
            .iter()
            .map(|(field, sig)| format!("{field}:{sig}"))
            .collect::<Vec<_>>()
            .join(",");
        let signature = format!("{name}{{{body}}}");
        Self {
            name,
            id: BinaryId::of_signature(&signature),
            signature,
            type_id: TypeId::of::<T>(),
            create: create_default::<T>,
        }
    }

    pub fn id(&self) -> BinaryId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Canonical signature the id was derived from.
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Default-construct a fresh instance to decode into.
    pub fn create(&self) -> Box<dyn BinaryObject> {
        (self.create)()
    }

    /// Create a blank instance and decode its fields from `d`.
    pub fn decode(&self, d: &mut Decoder<'_>) -> Result<Box<dyn BinaryObject>> {
        let mut obj = self.create();
        obj.decode(d)?;
        Ok(obj)
    }

    /// Whether two classes describe the same Rust type.
    pub fn same_type(&self, other: &BinaryClass) -> bool {
        self.type_id == other.type_id
    }
}

fn create_default<T: TypedObject>() -> Box<dyn BinaryObject> {
    Box::new(T::default())
}

impl fmt::Debug for BinaryClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinaryClass")
            .field("name", &self.name)
            .field("id", &self.id)
            .finish()
    }
}

/// Any value that can appear on the wire.
///
/// Implementations are generated by [`binary_object!`](crate::binary_object);
/// `encode` and `decode` must visit the same fields in the same order.
pub trait BinaryObject: Any + fmt::Debug + Send + Sync {
    fn class(&self) -> &'static BinaryClass;

    fn encode(&self, e: &mut Encoder<'_>) -> Result<()>;

    /// Decode fields in place into a `create()`-d instance.
    fn decode(&mut self, d: &mut Decoder<'_>) -> Result<()>;

    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send + Sync>;

    fn clone_object(&self) -> Box<dyn BinaryObject>;

    fn eq_object(&self, other: &dyn BinaryObject) -> bool;
}

/// Statically known wire types.
pub trait TypedObject: BinaryObject + Default + Clone + PartialEq + Sized {
    fn binary_class() -> &'static BinaryClass;

    fn binary_id() -> BinaryId {
        Self::binary_class().id()
    }
}

impl dyn BinaryObject {
    pub fn is<T: BinaryObject>(&self) -> bool {
        self.as_any().is::<T>()
    }

    pub fn downcast_ref<T: BinaryObject>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Recover the concrete type, or fail with [`Error::TypeMismatch`].
    pub fn downcast<T: BinaryObject>(self: Box<Self>) -> Result<Box<T>> {
        let actual = self.class().name();
        self.into_any()
            .downcast::<T>()
            .map_err(|_| Error::type_mismatch(std::any::type_name::<T>(), actual))
    }
}

impl PartialEq for dyn BinaryObject {
    fn eq(&self, other: &Self) -> bool {
        self.eq_object(other)
    }
}

impl Clone for Box<dyn BinaryObject> {
    fn clone(&self) -> Self {
        self.clone_object()
    }
}
