//! Addresses of server-side state.
//!
//! Paths are plain wire structs. Most calls accept any path through an
//! [`Object`] field; the [`TypedPath`] trait records which value type the
//! server returns for a `get` on a given path type.

use bytes::Bytes;

use rpclib_core::{binary_object, BinaryId, BinaryObject, FromValue, Object, Value};

use crate::types::{Capture, Device, ImageInfo, TimingInfo};

/// Marker for wire types that address server-side state.
pub trait Path: BinaryObject {}

/// A path whose `get` result has a statically known type.
pub trait TypedPath: Path + Clone {
    type Output: FromValue + Send + 'static;
}

binary_object! {
    /// A loaded capture.
    pub struct CapturePath("path.Capture") {
        pub id: BinaryId,
    }
}

binary_object! {
    /// The full atom list of a capture.
    pub struct AtomsPath("path.Atoms") {
        pub capture: CapturePath,
    }
}

binary_object! {
    /// A single atom within a capture's atom list.
    pub struct AtomPath("path.Atom") {
        pub atoms: AtomsPath,
        pub index: u64,
    }
}

binary_object! {
    /// The API state immediately after an atom executed.
    pub struct StatePath("path.State") {
        pub after: AtomPath,
    }
}

binary_object! {
    pub struct DevicePath("path.Device") {
        pub id: BinaryId,
    }
}

binary_object! {
    pub struct ImageInfoPath("path.ImageInfo") {
        pub id: BinaryId,
    }
}

binary_object! {
    pub struct BlobPath("path.Blob") {
        pub id: BinaryId,
    }
}

binary_object! {
    pub struct TimingInfoPath("path.TimingInfo") {
        pub id: BinaryId,
    }
}

binary_object! {
    /// A named field of the object at `parent`.
    pub struct FieldPath("path.Field") {
        pub parent: Object,
        pub name: String,
    }
}

binary_object! {
    /// An element of the array or slice at `array`.
    pub struct ArrayIndexPath("path.ArrayIndex") {
        pub array: Object,
        pub index: u64,
    }
}

binary_object! {
    /// An entry of the map at `map`.
    pub struct MapIndexPath("path.MapIndex") {
        pub map: Object,
        pub key: Value,
    }
}

impl CapturePath {
    pub fn new(id: BinaryId) -> Self {
        Self { id }
    }

    pub fn atoms(&self) -> AtomsPath {
        AtomsPath {
            capture: self.clone(),
        }
    }
}

impl AtomsPath {
    pub fn index(&self, index: u64) -> AtomPath {
        AtomPath {
            atoms: self.clone(),
            index,
        }
    }
}

impl AtomPath {
    pub fn state_after(&self) -> StatePath {
        StatePath {
            after: self.clone(),
        }
    }
}

impl StatePath {
    pub fn field(&self, name: impl Into<String>) -> FieldPath {
        FieldPath::of(self.clone(), name)
    }
}

impl FieldPath {
    pub fn of<P: Path>(parent: P, name: impl Into<String>) -> Self {
        Self {
            parent: Some(Box::new(parent)),
            name: name.into(),
        }
    }

    pub fn field(&self, name: impl Into<String>) -> FieldPath {
        FieldPath::of(self.clone(), name)
    }

    pub fn index(&self, index: u64) -> ArrayIndexPath {
        ArrayIndexPath {
            array: Some(Box::new(self.clone())),
            index,
        }
    }

    pub fn key(&self, key: impl Into<Value>) -> MapIndexPath {
        MapIndexPath {
            map: Some(Box::new(self.clone())),
            key: key.into(),
        }
    }
}

impl DevicePath {
    pub fn new(id: BinaryId) -> Self {
        Self { id }
    }
}

impl Path for CapturePath {}
impl Path for AtomsPath {}
impl Path for AtomPath {}
impl Path for StatePath {}
impl Path for DevicePath {}
impl Path for ImageInfoPath {}
impl Path for BlobPath {}
impl Path for TimingInfoPath {}
impl Path for FieldPath {}
impl Path for ArrayIndexPath {}
impl Path for MapIndexPath {}

impl TypedPath for CapturePath {
    type Output = Capture;
}

impl TypedPath for DevicePath {
    type Output = Device;
}

impl TypedPath for ImageInfoPath {
    type Output = ImageInfo;
}

impl TypedPath for TimingInfoPath {
    type Output = TimingInfo;
}

impl TypedPath for BlobPath {
    type Output = Bytes;
}
