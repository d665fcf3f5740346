//! Registration of every service wire type.

use rpclib_core::prelude::*;
use rpclib_core::Namespace;

use crate::errors::{ErrDataUnavailable, ErrInvalidArgument, ErrInvalidPath, RpcError};
use crate::messages::*;
use crate::path::{
    ArrayIndexPath, AtomPath, AtomsPath, BlobPath, CapturePath, DevicePath, FieldPath,
    ImageInfoPath, MapIndexPath, StatePath, TimingInfoPath,
};
use crate::schema::{Constant, ConstantSet, Entity, Schema, SchemaField};
use crate::stringtable::{Info, Msg, MsgArgument, StringEntry, StringTable};
use crate::types::{
    AtomRangeTimer, AtomTimer, Capture, Device, ImageInfo, RenderSettings, TimingInfo,
};

/// Add every path, value, error and message type to `namespace`.
///
/// Safe to call more than once on the same namespace.
pub fn register_service_types(namespace: &Namespace) -> Result<()> {
    // Paths
    namespace.add::<CapturePath>()?;
    namespace.add::<AtomsPath>()?;
    namespace.add::<AtomPath>()?;
    namespace.add::<StatePath>()?;
    namespace.add::<DevicePath>()?;
    namespace.add::<ImageInfoPath>()?;
    namespace.add::<BlobPath>()?;
    namespace.add::<TimingInfoPath>()?;
    namespace.add::<FieldPath>()?;
    namespace.add::<ArrayIndexPath>()?;
    namespace.add::<MapIndexPath>()?;

    // Values
    namespace.add::<Capture>()?;
    namespace.add::<Device>()?;
    namespace.add::<ImageInfo>()?;
    namespace.add::<AtomTimer>()?;
    namespace.add::<AtomRangeTimer>()?;
    namespace.add::<TimingInfo>()?;
    namespace.add::<RenderSettings>()?;
    namespace.add::<Schema>()?;
    namespace.add::<Entity>()?;
    namespace.add::<SchemaField>()?;
    namespace.add::<ConstantSet>()?;
    namespace.add::<Constant>()?;
    namespace.add::<Info>()?;
    namespace.add::<StringEntry>()?;
    namespace.add::<StringTable>()?;
    namespace.add::<Msg>()?;
    namespace.add::<MsgArgument>()?;

    // Errors
    namespace.add::<ErrDataUnavailable>()?;
    namespace.add::<ErrInvalidPath>()?;
    namespace.add::<ErrInvalidArgument>()?;
    namespace.add::<RpcError>()?;

    // Messages
    namespace.add::<CallFollow>()?;
    namespace.add::<ResultFollow>()?;
    namespace.add::<CallGet>()?;
    namespace.add::<ResultGet>()?;
    namespace.add::<CallSet>()?;
    namespace.add::<ResultSet>()?;
    namespace.add::<CallGetAvailableStringTables>()?;
    namespace.add::<ResultGetAvailableStringTables>()?;
    namespace.add::<CallGetCaptures>()?;
    namespace.add::<ResultGetCaptures>()?;
    namespace.add::<CallGetDevices>()?;
    namespace.add::<ResultGetDevices>()?;
    namespace.add::<CallGetFeatures>()?;
    namespace.add::<ResultGetFeatures>()?;
    namespace.add::<CallGetFramebufferColor>()?;
    namespace.add::<ResultGetFramebufferColor>()?;
    namespace.add::<CallGetFramebufferDepth>()?;
    namespace.add::<ResultGetFramebufferDepth>()?;
    namespace.add::<CallGetSchema>()?;
    namespace.add::<ResultGetSchema>()?;
    namespace.add::<CallGetStringTable>()?;
    namespace.add::<ResultGetStringTable>()?;
    namespace.add::<CallGetTimingInfo>()?;
    namespace.add::<ResultGetTimingInfo>()?;
    namespace.add::<CallImportCapture>()?;
    namespace.add::<ResultImportCapture>()?;
    namespace.add::<CallLoadCapture>()?;
    namespace.add::<ResultLoadCapture>()?;

    Ok(())
}

/// A fresh namespace holding the builtin boxes and every service type.
pub fn service_namespace() -> Result<Namespace> {
    let namespace = Namespace::with_builtins()?;
    register_service_types(&namespace)?;
    debug!("Service namespace ready with {} types", namespace.len());
    Ok(namespace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rpclib_core::TypedObject;

    #[test]
    fn test_service_namespace_resolves_messages() {
        let ns = service_namespace().unwrap();
        assert!(ns.contains(&CallGetSchema::binary_id()));
        assert!(ns.contains(&ResultLoadCapture::binary_id()));
        assert!(ns.contains(&ErrDataUnavailable::binary_id()));
        assert!(ns.contains(&rpclib_core::any::StringBox::binary_id()));
    }

    #[test]
    fn test_registration_is_idempotent() {
        let ns = service_namespace().unwrap();
        let before = ns.len();
        register_service_types(&ns).unwrap();
        assert_eq!(ns.len(), before);
    }

    #[test]
    fn test_no_two_service_types_share_an_id() {
        // 11 paths, 17 values, 4 errors, 28 messages, 9 builtins.
        let ns = service_namespace().unwrap();
        assert_eq!(ns.len(), 11 + 17 + 4 + 28 + 9);
    }
}
