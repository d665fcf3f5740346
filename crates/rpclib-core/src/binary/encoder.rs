//! Little-endian writer for wire values.

use bytes::{BufMut, Bytes, BytesMut};

use super::{BinaryId, BinaryObject, Field, Namespace, Object};
use crate::any::Value;
use crate::error::{Error, Result};

/// Append-only encoder bound to the namespace that decides which objects
/// may be written.
pub struct Encoder<'a> {
    buf: BytesMut,
    namespace: &'a Namespace,
}

impl<'a> Encoder<'a> {
    pub fn new(namespace: &'a Namespace) -> Self {
        Self {
            buf: BytesMut::new(),
            namespace,
        }
    }

    pub fn namespace(&self) -> &'a Namespace {
        self.namespace
    }

    pub fn bool(&mut self, v: bool) {
        self.buf.put_u8(u8::from(v));
    }

    pub fn u8(&mut self, v: u8) {
        self.buf.put_u8(v);
    }

    pub fn i8(&mut self, v: i8) {
        self.buf.put_i8(v);
    }

    pub fn u16(&mut self, v: u16) {
        self.buf.put_u16_le(v);
    }

    pub fn i16(&mut self, v: i16) {
        self.buf.put_i16_le(v);
    }

    pub fn u32(&mut self, v: u32) {
        self.buf.put_u32_le(v);
    }

    pub fn i32(&mut self, v: i32) {
        self.buf.put_i32_le(v);
    }

    pub fn u64(&mut self, v: u64) {
        self.buf.put_u64_le(v);
    }

    pub fn i64(&mut self, v: i64) {
        self.buf.put_i64_le(v);
    }

    pub fn f32(&mut self, v: f32) {
        self.buf.put_f32_le(v);
    }

    pub fn f64(&mut self, v: f64) {
        self.buf.put_f64_le(v);
    }

    /// Length prefix for strings, byte blobs and sequences.
    pub fn count(&mut self, n: usize) -> Result<()> {
        let n = u32::try_from(n)
            .map_err(|_| Error::invalid_data(format!("length {n} exceeds u32 range")))?;
        self.u32(n);
        Ok(())
    }

    pub fn string(&mut self, v: &str) -> Result<()> {
        self.bytes(v.as_bytes())
    }

    pub fn bytes(&mut self, v: &[u8]) -> Result<()> {
        self.count(v.len())?;
        self.buf.put_slice(v);
        Ok(())
    }

    pub fn id(&mut self, id: &BinaryId) {
        self.buf.put_slice(id.as_bytes());
    }

    /// Write a polymorphic object: [`BinaryId::ZERO`] for `None`, otherwise
    /// its id followed by its fields. The object's class must be registered.
    pub fn object(&mut self, obj: &Object) -> Result<()> {
        match obj {
            None => {
                self.id(&BinaryId::ZERO);
                Ok(())
            }
            Some(obj) => self.tagged(obj.as_ref()),
        }
    }

    /// Write an object known to be present, with its id.
    pub fn tagged(&mut self, obj: &dyn BinaryObject) -> Result<()> {
        let class = obj.class();
        if !self.namespace.contains(&class.id()) {
            return Err(Error::Unregistered {
                name: class.name(),
                id: class.id(),
            });
        }
        self.id(&class.id());
        obj.encode(self)
    }

    /// Write any [`Field`] in place.
    pub fn value<T: Field>(&mut self, v: &T) -> Result<()> {
        v.encode_field(self)
    }

    /// Write a dynamically typed value. Primitives travel inside their
    /// builtin box so the receiver can recover the type.
    pub fn variant(&mut self, v: &Value) -> Result<()> {
        match v {
            Value::Null => {
                self.id(&BinaryId::ZERO);
                Ok(())
            }
            Value::Object(obj) => self.tagged(obj.as_ref()),
            primitive => crate::any::Box::wrap(primitive.clone()).encode(self),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }
}

/// Encode a complete message: id followed by fields.
pub fn encode_object(namespace: &Namespace, obj: &dyn BinaryObject) -> Result<Bytes> {
    let mut e = Encoder::new(namespace);
    e.tagged(obj)?;
    Ok(e.into_bytes())
}
