//! Round trips of individual service calls through the full stack.

use bytes::Bytes;

use gfxtrace_service::messages::*;
use gfxtrace_service::{
    Capture, CapturePath, DevicePath, Schema, ServiceClient, TimingFlags, TimingInfoPath,
};
use rpclib_core::{encode_object, BinaryId, TypedObject, Value};
use rpclib_rpc::test_utils::ServerReply;
use rpclib_rpc::DEFAULT_PROTOCOL_VERSION;

use crate::{namespace, start};

#[tokio::test]
async fn test_get_schema_resolves_to_empty_schema() {
    let call_bytes = encode_object(&namespace(), &CallGetSchema {}).unwrap();
    assert_eq!(call_bytes.len(), 20);
    assert_eq!(&call_bytes[..], CallGetSchema::binary_id().as_bytes());

    let (client, server) = start(|call| async move {
        if call.is::<CallGetSchema>() {
            ServerReply::from(ResultGetSchema {
                value: Schema::default(),
            })
        } else {
            ServerReply::Silent
        }
    })
    .await;

    let schema = client.get_schema().await.unwrap();
    assert_eq!(schema, Schema::default());
    assert!(schema.classes.is_empty());
    assert!(schema.constants.is_empty());
    assert_eq!(server.handshake_version(), Some(DEFAULT_PROTOCOL_VERSION));
    assert_eq!(server.received(), 1);
}

#[tokio::test]
async fn test_import_capture_serializes_and_echoes() {
    let data = Bytes::from_static(&[0xde, 0xad, 0xbe, 0xef, 0x01]);
    let call = CallImportCapture {
        name: "foo.trace".into(),
        data: data.clone(),
    };
    let encoded = encode_object(&namespace(), &call).unwrap();
    let payload = &encoded[20..];
    assert_eq!(&payload[..4], &9u32.to_le_bytes());
    assert_eq!(&payload[4..13], b"foo.trace");
    assert_eq!(&payload[13..17], &5u32.to_le_bytes());
    assert_eq!(&payload[17..], &data[..]);

    let (client, _server) = start(|call| async move {
        match call.downcast_ref::<CallImportCapture>() {
            Some(import) => ServerReply::from(ResultImportCapture {
                value: CapturePath::new(BinaryId::of_signature(&import.name)),
            }),
            None => ServerReply::Silent,
        }
    })
    .await;

    let path = client.import_capture("foo.trace", data).await.unwrap();
    assert_eq!(path, CapturePath::new(BinaryId::of_signature("foo.trace")));
}

#[tokio::test]
async fn test_typed_get_returns_capture() {
    let (client, _server) = start(|call| async move {
        match call.downcast_ref::<CallGet>() {
            Some(get) if get.p.as_deref().is_some_and(|p| p.is::<CapturePath>()) => {
                ServerReply::from(ResultGet {
                    value: Value::object(Capture {
                        name: "frame".into(),
                        apis: vec![BinaryId::of_signature("gles")],
                        ..Default::default()
                    }),
                })
            }
            _ => ServerReply::Silent,
        }
    })
    .await;

    let path = CapturePath::new(BinaryId::of_signature("frame"));
    let capture = client.get_typed(&path).await.unwrap();
    assert_eq!(capture.name, "frame");
    assert_eq!(capture.apis.len(), 1);
}

#[tokio::test]
async fn test_timing_info_passes_flags() {
    let (client, _server) = start(|call| async move {
        match call.downcast_ref::<CallGetTimingInfo>() {
            Some(timing) => ServerReply::from(ResultGetTimingInfo {
                value: TimingInfoPath {
                    id: BinaryId::of_signature(&format!("timing-{}", timing.flags.bits())),
                },
            }),
            None => ServerReply::Silent,
        }
    })
    .await;

    let flags = TimingFlags::GPU | TimingFlags::PER_FRAME;
    let path = client
        .get_timing_info(
            &DevicePath::new(BinaryId::of_signature("device")),
            &CapturePath::new(BinaryId::of_signature("capture")),
            flags,
        )
        .await
        .unwrap();
    assert_eq!(
        path.id,
        BinaryId::of_signature(&format!("timing-{}", flags.bits()))
    );
}
