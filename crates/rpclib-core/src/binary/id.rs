//! Fixed-length type identifiers.

use std::fmt;

use sha1::{Digest, Sha1};

/// Number of bytes in a [`BinaryId`].
pub const ID_SIZE: usize = 20;

/// Opaque 20-byte identifier naming a registered wire type.
///
/// Computed once per type as the SHA-1 of its canonical signature, so two
/// peers agree on an id exactly when they agree on the type's field layout.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct BinaryId([u8; ID_SIZE]);

impl BinaryId {
    /// Reserved all-zero id. Encodes a null object or an empty variant.
    pub const ZERO: BinaryId = BinaryId([0; ID_SIZE]);

    pub const fn from_bytes(bytes: [u8; ID_SIZE]) -> Self {
        Self(bytes)
    }

    /// Hash a type signature into its id.
    pub fn of_signature(signature: &str) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(signature.as_bytes());
        Self(hasher.finalize().into())
    }

    pub fn as_bytes(&self) -> &[u8; ID_SIZE] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0; ID_SIZE]
    }
}

impl fmt::Display for BinaryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for BinaryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BinaryId({})", hex::encode(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_hash_is_stable() {
        let a = BinaryId::of_signature("service.CallGetSchema{}");
        let b = BinaryId::of_signature("service.CallGetSchema{}");
        assert_eq!(a, b);
        assert_ne!(a, BinaryId::of_signature("service.CallGetFeatures{}"));
    }

    #[test]
    fn test_zero_id() {
        assert!(BinaryId::ZERO.is_zero());
        assert!(!BinaryId::of_signature("x").is_zero());
        assert_eq!(BinaryId::default(), BinaryId::ZERO);
    }

    #[test]
    fn test_display_is_hex() {
        let id = BinaryId::from_bytes([0xab; ID_SIZE]);
        assert_eq!(id.to_string(), "ab".repeat(ID_SIZE));
    }
}
