//! Little-endian reader for wire values.

use bytes::{Buf, Bytes};

use super::{BinaryId, BinaryObject, Field, Namespace, Object, ID_SIZE};
use crate::any::Value;
use crate::error::{Error, Result};

/// Deepest nesting of polymorphic objects a message may contain.
pub const MAX_OBJECT_DEPTH: usize = 256;

/// Cursor over a received buffer. Every read checks the remaining length
/// first, so truncated input surfaces as [`Error::UnexpectedEof`] rather
/// than a panic.
pub struct Decoder<'a> {
    buf: Bytes,
    namespace: &'a Namespace,
    depth: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(namespace: &'a Namespace, buf: Bytes) -> Self {
        Self {
            buf,
            namespace,
            depth: 0,
        }
    }

    pub fn namespace(&self) -> &'a Namespace {
        self.namespace
    }

    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    fn need(&self, needed: usize) -> Result<()> {
        let remaining = self.buf.remaining();
        if remaining < needed {
            return Err(Error::UnexpectedEof { needed, remaining });
        }
        Ok(())
    }

    pub fn bool(&mut self) -> Result<bool> {
        match self.u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(Error::invalid_data(format!("invalid bool byte {other:#04x}"))),
        }
    }

    pub fn u8(&mut self) -> Result<u8> {
        self.need(1)?;
        Ok(self.buf.get_u8())
    }

    pub fn i8(&mut self) -> Result<i8> {
        self.need(1)?;
        Ok(self.buf.get_i8())
    }

    pub fn u16(&mut self) -> Result<u16> {
        self.need(2)?;
        Ok(self.buf.get_u16_le())
    }

    pub fn i16(&mut self) -> Result<i16> {
        self.need(2)?;
        Ok(self.buf.get_i16_le())
    }

    pub fn u32(&mut self) -> Result<u32> {
        self.need(4)?;
        Ok(self.buf.get_u32_le())
    }

    pub fn i32(&mut self) -> Result<i32> {
        self.need(4)?;
        Ok(self.buf.get_i32_le())
    }

    pub fn u64(&mut self) -> Result<u64> {
        self.need(8)?;
        Ok(self.buf.get_u64_le())
    }

    pub fn i64(&mut self) -> Result<i64> {
        self.need(8)?;
        Ok(self.buf.get_i64_le())
    }

    pub fn f32(&mut self) -> Result<f32> {
        self.need(4)?;
        Ok(self.buf.get_f32_le())
    }

    pub fn f64(&mut self) -> Result<f64> {
        self.need(8)?;
        Ok(self.buf.get_f64_le())
    }

    /// Read a length prefix.
    pub fn count(&mut self) -> Result<usize> {
        Ok(self.u32()? as usize)
    }

    /// Capacity to reserve for `count` elements. A hostile count never
    /// reserves more slots than there are bytes left to read.
    pub fn capacity_hint(&self, count: usize) -> usize {
        count.min(self.remaining())
    }

    pub fn bytes(&mut self) -> Result<Bytes> {
        let len = self.count()?;
        self.need(len)?;
        Ok(self.buf.split_to(len))
    }

    pub fn string(&mut self) -> Result<String> {
        let raw = self.bytes()?;
        String::from_utf8(raw.to_vec())
            .map_err(|e| Error::invalid_data(format!("string is not valid UTF-8: {e}")))
    }

    pub fn id(&mut self) -> Result<BinaryId> {
        self.need(ID_SIZE)?;
        let mut raw = [0u8; ID_SIZE];
        self.buf.copy_to_slice(&mut raw);
        Ok(BinaryId::from_bytes(raw))
    }

    /// Read a polymorphic object. The zero id decodes to `None`.
    ///
    /// Objects nested more than [`MAX_OBJECT_DEPTH`] deep are rejected.
    pub fn object(&mut self) -> Result<Object> {
        let id = self.id()?;
        if id.is_zero() {
            return Ok(None);
        }
        let class = self.namespace.lookup(&id)?;
        if self.depth >= MAX_OBJECT_DEPTH {
            return Err(Error::invalid_data(format!(
                "objects nested deeper than {MAX_OBJECT_DEPTH} at {}",
                class.name()
            )));
        }
        self.depth += 1;
        let result = class.decode(self).map(Some);
        self.depth -= 1;
        result
    }

    /// Read an object that must be present.
    pub fn tagged(&mut self) -> Result<Box<dyn BinaryObject>> {
        self.object()?
            .ok_or_else(|| Error::invalid_data("expected an object, found null"))
    }

    /// Read any [`Field`] in place.
    pub fn value<T: Field>(&mut self) -> Result<T> {
        T::decode_field(self)
    }

    /// Read a dynamically typed value, unwrapping builtin boxes.
    pub fn variant(&mut self) -> Result<Value> {
        Ok(crate::any::Box::decode(self)?.unwrap())
    }
}

/// Decode a complete message. Bytes left over after the object are an
/// error.
pub fn decode_object(namespace: &Namespace, buf: Bytes) -> Result<Box<dyn BinaryObject>> {
    let mut d = Decoder::new(namespace, buf);
    let obj = d.tagged()?;
    if d.remaining() > 0 {
        return Err(Error::invalid_data(format!(
            "{} trailing bytes after {}",
            d.remaining(),
            obj.class().name()
        )));
    }
    Ok(obj)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::TypedObject;

    fn decoder<'a>(ns: &'a Namespace, raw: &'static [u8]) -> Decoder<'a> {
        Decoder::new(ns, Bytes::from_static(raw))
    }

    #[test]
    fn test_reads_little_endian() {
        let ns = Namespace::new();
        let mut d = decoder(&ns, &[0x04, 0x03, 0x02, 0x01, 0x01]);
        assert_eq!(d.u32().unwrap(), 0x01020304);
        assert!(d.bool().unwrap());
        assert_eq!(d.remaining(), 0);
    }

    #[test]
    fn test_truncated_input_is_eof() {
        let ns = Namespace::new();
        let mut d = decoder(&ns, &[1, 2, 3]);
        let err = d.u32().unwrap_err();
        assert!(matches!(
            err,
            Error::UnexpectedEof {
                needed: 4,
                remaining: 3
            }
        ));
    }

    #[test]
    fn test_invalid_bool_rejected() {
        let ns = Namespace::new();
        let mut d = decoder(&ns, &[2]);
        assert!(matches!(d.bool(), Err(Error::InvalidData { .. })));
    }

    #[test]
    fn test_string_length_past_end_is_eof() {
        let ns = Namespace::new();
        let mut d = decoder(&ns, &[10, 0, 0, 0, b'a']);
        assert!(matches!(d.string(), Err(Error::UnexpectedEof { .. })));
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        let ns = Namespace::new();
        let mut d = decoder(&ns, &[2, 0, 0, 0, 0xff, 0xfe]);
        assert!(matches!(d.string(), Err(Error::InvalidData { .. })));
    }

    #[test]
    fn test_zero_id_is_null_object() {
        let ns = Namespace::new();
        let mut d = decoder(&ns, &[0; ID_SIZE]);
        assert!(d.object().unwrap().is_none());
    }

    #[test]
    fn test_unknown_id_fails() {
        let ns = Namespace::new();
        let mut d = decoder(&ns, &[0x11; ID_SIZE]);
        let err = d.object().unwrap_err();
        assert!(matches!(err, Error::UnknownType { .. }));
    }

    crate::binary_object! {
        struct Node("test.Node") {
            child: Object,
        }
    }

    /// `nodes` nested `Node`s ending in a null child.
    fn nested_nodes(nodes: usize) -> Bytes {
        let mut raw = Vec::with_capacity((nodes + 1) * ID_SIZE);
        for _ in 0..nodes {
            raw.extend_from_slice(Node::binary_id().as_bytes());
        }
        raw.extend_from_slice(&[0; ID_SIZE]);
        Bytes::from(raw)
    }

    #[test]
    fn test_nesting_up_to_limit_decodes() {
        let ns = Namespace::new();
        ns.add::<Node>().unwrap();
        let obj = decode_object(&ns, nested_nodes(MAX_OBJECT_DEPTH)).unwrap();
        assert!(obj.is::<Node>());
    }

    #[test]
    fn test_deep_nesting_is_invalid_data() {
        let ns = Namespace::new();
        ns.add::<Node>().unwrap();

        let err = decode_object(&ns, nested_nodes(MAX_OBJECT_DEPTH + 1)).unwrap_err();
        assert!(matches!(err, Error::InvalidData { .. }));

        // Far past the limit still fails cleanly instead of exhausting the stack.
        let err = decode_object(&ns, nested_nodes(500_000)).unwrap_err();
        assert!(matches!(err, Error::InvalidData { .. }));
    }

    #[test]
    fn test_huge_count_does_not_preallocate() {
        let ns = Namespace::new();
        let d = decoder(&ns, &[1, 2, 3]);
        assert_eq!(d.capacity_hint(u32::MAX as usize), 3);
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let ns = Namespace::with_builtins().unwrap();
        let mut raw = crate::binary::encode_object(&ns, &crate::any::BoolBox { value: true })
            .unwrap()
            .to_vec();
        raw.push(0);
        let err = decode_object(&ns, Bytes::from(raw)).unwrap_err();
        assert!(err.to_string().contains("trailing"));
    }
}
