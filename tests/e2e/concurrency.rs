//! Many concurrent calls with replies arriving out of order.

use std::time::Duration;

use futures_util::future::join_all;

use gfxtrace_service::messages::*;
use gfxtrace_service::{CapturePath, FieldPath, ServiceClient};
use rpclib_core::{BinaryId, BinaryObject, Value};
use rpclib_rpc::test_utils::{FakeServer, ServerReply};

use crate::{namespace, start_server};

const CALLS: usize = 64;

fn field(i: usize) -> FieldPath {
    FieldPath::of(
        CapturePath::new(BinaryId::of_signature("capture")),
        format!("f{i}"),
    )
}

/// `get` answers with the field name; `set` answers with the path it got.
async fn answer(call: Box<dyn BinaryObject>) -> ServerReply {
    if let Some(get) = call.downcast_ref::<CallGet>() {
        let name = get
            .p
            .as_deref()
            .and_then(|p| p.downcast_ref::<FieldPath>())
            .map(|f| f.name.clone())
            .unwrap_or_default();
        return ServerReply::from(ResultGet {
            value: Value::String(name),
        });
    }
    if let Some(set) = call.downcast_ref::<CallSet>() {
        return ServerReply::from(ResultSet {
            value: set.p.clone(),
        });
    }
    ServerReply::Silent
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_out_of_order_replies_reach_their_own_calls() {
    let server =
        FakeServer::new(namespace(), answer).with_random_delay(Duration::from_millis(25));
    let (client, handle) = start_server(server).await;

    let gets: Vec<_> = (0..CALLS).map(|i| client.get(&field(i))).collect();
    let sets: Vec<_> = (0..CALLS)
        .map(|i| client.set(&field(CALLS + i), Value::Uint32(i as u32)))
        .collect();

    let (gets, sets) = tokio::join!(join_all(gets), join_all(sets));

    for (i, result) in gets.into_iter().enumerate() {
        assert_eq!(result.unwrap(), Value::String(format!("f{i}")));
    }
    for (i, result) in sets.into_iter().enumerate() {
        let path = result.unwrap();
        let path = path
            .as_deref()
            .and_then(|p| p.downcast_ref::<FieldPath>())
            .cloned();
        assert_eq!(path, Some(field(CALLS + i)));
    }

    assert_eq!(handle.received(), 2 * CALLS);
    assert_eq!(client.transport().pending_count(), 0);
}

#[tokio::test]
async fn test_clones_share_one_connection() {
    let server =
        FakeServer::new(namespace(), answer).with_random_delay(Duration::from_millis(5));
    let (client, handle) = start_server(server).await;

    let tasks: Vec<_> = (0..8)
        .map(|i| {
            let client = client.clone();
            tokio::spawn(async move { client.get(&field(i)).await })
        })
        .collect();

    for (i, task) in join_all(tasks).await.into_iter().enumerate() {
        assert_eq!(task.unwrap().unwrap(), Value::String(format!("f{i}")));
    }
    assert_eq!(handle.received(), 8);
}
