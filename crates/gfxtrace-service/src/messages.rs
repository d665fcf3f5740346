//! Request and reply structs, one pair per service method.

use bytes::Bytes;

use rpclib_core::{binary_object, Object, TypedObject, Value};

use crate::path::{AtomPath, CapturePath, DevicePath, ImageInfoPath, TimingInfoPath};
use crate::schema::Schema;
use crate::stringtable::{Info, StringTable};
use crate::types::{RenderSettings, TimingFlags};

/// A request struct, statically paired with its reply struct.
pub trait CallMessage: TypedObject {
    type Result: ResultMessage;

    /// Method name used in logs and error context.
    const METHOD: &'static str;
}

/// A reply struct carrying a single `value`.
pub trait ResultMessage: TypedObject {
    type Value: Send + 'static;

    fn into_value(self) -> Self::Value;
}

macro_rules! rpc_method {
    (
        $method:literal,
        $call:ident($call_wire:literal) { $($field:ident: $fty:ty),* $(,)? }
        -> $result:ident($result_wire:literal) { value: $value:ty }
    ) => {
        binary_object! {
            pub struct $call($call_wire) {
                $(pub $field: $fty,)*
            }
        }

        binary_object! {
            pub struct $result($result_wire) {
                pub value: $value,
            }
        }

        impl CallMessage for $call {
            type Result = $result;
            const METHOD: &'static str = $method;
        }

        impl ResultMessage for $result {
            type Value = $value;

            fn into_value(self) -> $value {
                self.value
            }
        }
    };
}

rpc_method! {
    "follow",
    CallFollow("service.CallFollow") { p: Object }
    -> ResultFollow("service.ResultFollow") { value: Object }
}

rpc_method! {
    "get",
    CallGet("service.CallGet") { p: Object }
    -> ResultGet("service.ResultGet") { value: Value }
}

rpc_method! {
    "set",
    CallSet("service.CallSet") { p: Object, v: Value }
    -> ResultSet("service.ResultSet") { value: Object }
}

rpc_method! {
    "get_available_string_tables",
    CallGetAvailableStringTables("service.CallGetAvailableStringTables") {}
    -> ResultGetAvailableStringTables("service.ResultGetAvailableStringTables") { value: Vec<Info> }
}

rpc_method! {
    "get_captures",
    CallGetCaptures("service.CallGetCaptures") {}
    -> ResultGetCaptures("service.ResultGetCaptures") { value: Vec<CapturePath> }
}

rpc_method! {
    "get_devices",
    CallGetDevices("service.CallGetDevices") {}
    -> ResultGetDevices("service.ResultGetDevices") { value: Vec<DevicePath> }
}

rpc_method! {
    "get_features",
    CallGetFeatures("service.CallGetFeatures") {}
    -> ResultGetFeatures("service.ResultGetFeatures") { value: Vec<String> }
}

rpc_method! {
    "get_framebuffer_color",
    CallGetFramebufferColor("service.CallGetFramebufferColor") {
        device: DevicePath,
        after: AtomPath,
        settings: RenderSettings,
    }
    -> ResultGetFramebufferColor("service.ResultGetFramebufferColor") { value: ImageInfoPath }
}

rpc_method! {
    "get_framebuffer_depth",
    CallGetFramebufferDepth("service.CallGetFramebufferDepth") {
        device: DevicePath,
        after: AtomPath,
    }
    -> ResultGetFramebufferDepth("service.ResultGetFramebufferDepth") { value: ImageInfoPath }
}

rpc_method! {
    "get_schema",
    CallGetSchema("service.CallGetSchema") {}
    -> ResultGetSchema("service.ResultGetSchema") { value: Schema }
}

rpc_method! {
    "get_string_table",
    CallGetStringTable("service.CallGetStringTable") { info: Info }
    -> ResultGetStringTable("service.ResultGetStringTable") { value: StringTable }
}

rpc_method! {
    "get_timing_info",
    CallGetTimingInfo("service.CallGetTimingInfo") {
        device: DevicePath,
        capture: CapturePath,
        flags: TimingFlags,
    }
    -> ResultGetTimingInfo("service.ResultGetTimingInfo") { value: TimingInfoPath }
}

rpc_method! {
    "import_capture",
    CallImportCapture("service.CallImportCapture") { name: String, data: Bytes }
    -> ResultImportCapture("service.ResultImportCapture") { value: CapturePath }
}

rpc_method! {
    "load_capture",
    CallLoadCapture("service.CallLoadCapture") { path: String }
    -> ResultLoadCapture("service.ResultLoadCapture") { value: CapturePath }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rpclib_core::{encode_object, Namespace};

    #[test]
    fn test_call_get_schema_is_id_only() {
        let ns = Namespace::new();
        ns.add::<CallGetSchema>().unwrap();
        let bytes = encode_object(&ns, &CallGetSchema {}).unwrap();
        assert_eq!(bytes.len(), 20);
        assert_eq!(&bytes[..], CallGetSchema::binary_id().as_bytes());
    }

    #[test]
    fn test_import_capture_layout() {
        let ns = Namespace::new();
        ns.add::<CallImportCapture>().unwrap();
        let call = CallImportCapture {
            name: "foo.trace".into(),
            data: Bytes::from_static(&[1, 2, 3]),
        };
        let bytes = encode_object(&ns, &call).unwrap();

        let mut expected = CallImportCapture::binary_id().as_bytes().to_vec();
        expected.extend_from_slice(&9u32.to_le_bytes());
        expected.extend_from_slice(b"foo.trace");
        expected.extend_from_slice(&3u32.to_le_bytes());
        expected.extend_from_slice(&[1, 2, 3]);
        assert_eq!(&bytes[..], &expected[..]);
    }

    #[test]
    fn test_methods_are_paired() {
        assert_eq!(<CallGetDevices as CallMessage>::METHOD, "get_devices");
        let result = ResultGetFeatures {
            value: vec!["rpc-string-tables".into()],
        };
        assert_eq!(result.into_value(), vec!["rpc-string-tables".to_string()]);
    }

    #[test]
    fn test_call_and_result_ids_differ() {
        assert_ne!(CallGetSchema::binary_id(), ResultGetSchema::binary_id());
        assert_ne!(CallGet::binary_id(), CallFollow::binary_id());
    }
}
