//! Errors confined to one call, and errors that end the connection.

use std::time::Duration;

use bytes::Bytes;

use gfxtrace_service::errors::ErrDataUnavailable;
use gfxtrace_service::messages::*;
use gfxtrace_service::{Msg, Schema, ServiceClient};
use rpclib_core::{Error, RemoteError};
use rpclib_rpc::test_utils::ServerReply;
use rpclib_rpc::ConnectionState;

use crate::{start, wait_for_received};

#[tokio::test]
async fn test_undecodable_reply_fails_only_its_call() {
    let (client, _server) = start(|call| async move {
        if call.is::<CallGetFeatures>() {
            // An id no namespace knows.
            ServerReply::Raw(Bytes::from_static(&[0xab; 20]))
        } else {
            ServerReply::from(ResultGetSchema {
                value: Schema::default(),
            })
        }
    })
    .await;

    let features = client.get_features();
    let schema = client.get_schema();

    let err = features.await.unwrap_err();
    assert!(matches!(err.root(), Error::UnknownType { .. }));
    assert!(err.is_fatal());
    assert_eq!(schema.await.unwrap(), Schema::default());
    assert!(client.transport().is_connected());
}

#[tokio::test]
async fn test_server_error_object_maps_to_remote_error() {
    let (client, _server) = start(|_| async move {
        ServerReply::from(ErrDataUnavailable {
            reason: Some(Box::new(Msg::new("ERR_REPLAY_BUSY").with_argument("queue", 3u32))),
            transient: true,
        })
    })
    .await;

    let line = line!() + 1;
    let err = client.get_devices().await.unwrap_err();
    match &err {
        Error::Call {
            method,
            location,
            source,
        } => {
            assert_eq!(*method, "get_devices");
            assert_eq!(location.line(), line);
            match source.as_ref() {
                Error::Remote(remote) => assert_eq!(
                    remote,
                    &RemoteError::DataUnavailable {
                        reason: "ERR_REPLAY_BUSY(queue=3)".into(),
                        transient: true,
                    }
                ),
                other => panic!("expected remote error, got {other:?}"),
            }
        }
        other => panic!("expected call-site error, got {other:?}"),
    }
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_server_shutdown_fails_pending_calls() {
    let (client, server) = start(|_| async move { ServerReply::Silent }).await;

    let pending = client.get_captures();
    wait_for_received(&server, 1).await;
    server.shutdown();

    let err = tokio::time::timeout(Duration::from_secs(5), pending)
        .await
        .expect("pending call resolves")
        .unwrap_err();
    assert!(matches!(err.root(), Error::Transport { .. }));
    assert!(err.is_recoverable());
    assert!(matches!(
        client.transport().connection_state(),
        ConnectionState::Closed { .. }
    ));

    let later = client.get_captures().await.unwrap_err();
    assert!(matches!(
        later.root(),
        Error::ChannelClosed | Error::Transport { .. }
    ));
}
