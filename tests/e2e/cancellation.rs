//! Cancelled and timed-out calls.

use std::time::Duration;

use gfxtrace_service::messages::*;
use gfxtrace_service::{CallState, Schema, ServiceClient};
use rpclib_core::Error;
use rpclib_rpc::test_utils::ServerReply;

use crate::{start, wait_for_received};

/// Replies to `get_schema` after 100ms, to `get_features` at once.
async fn slow_schema(call: Box<dyn rpclib_core::BinaryObject>) -> ServerReply {
    if call.is::<CallGetSchema>() {
        tokio::time::sleep(Duration::from_millis(100)).await;
        return ServerReply::from(ResultGetSchema {
            value: Schema::default(),
        });
    }
    ServerReply::from(ResultGetFeatures {
        value: vec!["rpc-string-tables".into()],
    })
}

#[tokio::test]
async fn test_cancelled_call_ignores_late_reply() {
    let (client, server) = start(slow_schema).await;

    let handle = client.get_schema();
    wait_for_received(&server, 1).await;
    assert_eq!(client.transport().pending_count(), 1);

    handle.cancel();
    assert_eq!(handle.state(), CallState::Cancelled);

    // Let the late reply arrive and be discarded.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(client.transport().pending_count(), 0);
    assert!(matches!(handle.await, Err(Error::Cancelled)));

    // The connection is unaffected.
    let features = client.get_features().await.unwrap();
    assert_eq!(features, vec!["rpc-string-tables".to_string()]);
}

#[tokio::test]
async fn test_cancel_before_send_has_no_effect_on_server() {
    let (client, server) = start(slow_schema).await;

    let handle = client.get_schema();
    handle.cancel();
    assert!(handle.await.unwrap_err().is_cancelled());

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(client.transport().pending_count(), 0);
    assert!(server.received() <= 1);
}

#[tokio::test]
async fn test_wait_timeout_cancels_pending_call() {
    let (client, _server) = start(slow_schema).await;

    let err = client
        .get_schema()
        .wait_timeout(Duration::from_millis(10))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Timeout {
            method: "get_schema",
            ..
        }
    ));
    assert!(err.is_retryable());

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(client.transport().pending_count(), 0);
}

#[tokio::test]
async fn test_cancel_after_completion_keeps_result() {
    let (client, _server) = start(slow_schema).await;

    let mut handle = client.get_features();
    while !handle.state().is_terminal() {
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    handle.cancel();
    assert_eq!(handle.state(), CallState::Completed);
    assert!((&mut handle).await.is_ok());
}
