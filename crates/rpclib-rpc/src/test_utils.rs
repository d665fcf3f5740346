//! Test utilities for transports
//!
//! - [`FakeServer`]: an in-process peer on the far side of a
//!   `tokio::io::duplex` pipe. Speaks the real framing, decodes each call,
//!   and answers through a caller-supplied handler, optionally after a
//!   random delay so replies come back out of order.
//! - [`FakeTransport`]: a [`Transport`] that answers synchronously from a
//!   closure and records every call it was handed.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use rand::Rng;
use tokio::io::duplex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use rpclib_core::prelude::*;
use rpclib_core::{decode_object, encode_object, BinaryObject, Namespace};

use crate::broadcaster::{Broadcaster, BroadcasterConfig};
use crate::frame::{self, Frame};
use crate::transport::Transport;

/// Size of the in-memory pipe between client and fake server.
const PIPE_CAPACITY: usize = 64 * 1024;

/// What the fake server does with one call.
pub enum ServerReply {
    /// Encode and send this object.
    Object(Box<dyn BinaryObject>),
    /// Send these bytes as the body verbatim.
    Raw(Bytes),
    /// Never answer.
    Silent,
}

impl<T: BinaryObject> From<T> for ServerReply {
    fn from(obj: T) -> Self {
        ServerReply::Object(Box::new(obj))
    }
}

type Handler = Arc<dyn Fn(Box<dyn BinaryObject>) -> BoxFuture<'static, ServerReply> + Send + Sync>;

/// In-process server for end-to-end tests.
pub struct FakeServer {
    namespace: Arc<Namespace>,
    handler: Handler,
    max_delay: Option<Duration>,
}

impl FakeServer {
    pub fn new<F, Fut>(namespace: Arc<Namespace>, handler: F) -> Self
    where
        F: Fn(Box<dyn BinaryObject>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ServerReply> + Send + 'static,
    {
        Self {
            namespace,
            handler: Arc::new(move |call: Box<dyn BinaryObject>| handler(call).boxed()),
            max_delay: None,
        }
    }

    /// Delay every reply by a random duration up to `max`.
    pub fn with_random_delay(mut self, max: Duration) -> Self {
        self.max_delay = Some(max);
        self
    }

    /// Start the server and connect a [`Broadcaster`] to it.
    pub async fn connect(
        self,
        config: BroadcasterConfig,
    ) -> Result<(Broadcaster, FakeServerHandle)> {
        let (client, server) = duplex(PIPE_CAPACITY);
        let (server_read, server_write) = tokio::io::split(server);

        let namespace = Arc::clone(&self.namespace);
        let stats = Arc::new(ServerStats::default());
        let (reply_tx, reply_rx) = mpsc::unbounded_channel::<Frame>();

        let writer = tokio::spawn(run_server_writer(server_write, reply_rx));
        let reader = tokio::spawn(run_server_reader(
            server_read,
            reply_tx,
            self,
            Arc::clone(&stats),
        ));

        let (client_read, client_write) = tokio::io::split(client);
        let broadcaster = Broadcaster::connect(client_read, client_write, config, namespace).await?;

        Ok((
            broadcaster,
            FakeServerHandle {
                reader,
                writer,
                stats,
            },
        ))
    }
}

/// Counters the server updates as it works.
#[derive(Default)]
struct ServerStats {
    received: AtomicUsize,
    version: Mutex<Option<u32>>,
}

/// Controls a running [`FakeServer`].
pub struct FakeServerHandle {
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
    stats: Arc<ServerStats>,
}

impl FakeServerHandle {
    /// Number of calls decoded so far.
    pub fn received(&self) -> usize {
        self.stats.received.load(Ordering::SeqCst)
    }

    /// Protocol version from the client's handshake, once read.
    pub fn handshake_version(&self) -> Option<u32> {
        *self.stats.version.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Drop the server's end of the pipe.
    pub fn shutdown(self) {
        self.reader.abort();
        self.writer.abort();
    }
}

async fn run_server_reader<R>(
    mut reader: R,
    reply_tx: mpsc::UnboundedSender<Frame>,
    server: FakeServer,
    stats: Arc<ServerStats>,
) where
    R: tokio::io::AsyncRead + Unpin,
{
    match frame::read_handshake(&mut reader).await {
        Ok(version) => {
            *stats.version.lock().unwrap_or_else(|e| e.into_inner()) = Some(version);
        }
        Err(e) => {
            warn!("Fake server: bad handshake: {}", e);
            return;
        }
    }

    loop {
        let frame = match frame::read_frame(&mut reader).await {
            Ok(Some(frame)) => frame,
            Ok(None) => return,
            Err(e) => {
                warn!("Fake server: read failed: {}", e);
                return;
            }
        };
        let call = match decode_object(&server.namespace, frame.body) {
            Ok(call) => call,
            Err(e) => {
                warn!("Fake server: undecodable call {}: {}", frame.id, e);
                continue;
            }
        };
        stats.received.fetch_add(1, Ordering::SeqCst);

        let delay = server.max_delay.map(|max| {
            let millis = rand::thread_rng().gen_range(0..=max.as_millis() as u64);
            Duration::from_millis(millis)
        });
        let handler = Arc::clone(&server.handler);
        let namespace = Arc::clone(&server.namespace);
        let reply_tx = reply_tx.clone();
        let id = frame.id;

        tokio::spawn(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            let body = match handler(call).await {
                ServerReply::Object(obj) => match encode_object(&namespace, obj.as_ref()) {
                    Ok(body) => body,
                    Err(e) => {
                        warn!("Fake server: cannot encode reply {}: {}", id, e);
                        return;
                    }
                },
                ServerReply::Raw(body) => body,
                ServerReply::Silent => return,
            };
            let _ = reply_tx.send(Frame { id, body });
        });
    }
}

async fn run_server_writer<W>(mut writer: W, mut reply_rx: mpsc::UnboundedReceiver<Frame>)
where
    W: tokio::io::AsyncWrite + Unpin,
{
    while let Some(frame) = reply_rx.recv().await {
        if let Err(e) = frame::write_frame(&mut writer, &frame, frame::MIN_MTU).await {
            warn!("Fake server: write failed: {}", e);
            return;
        }
    }
}

// ---------------------------------------------------------------------------
// FakeTransport
// ---------------------------------------------------------------------------

type Responder = dyn Fn(&dyn BinaryObject) -> Result<Box<dyn BinaryObject>> + Send + Sync;

/// A [`Transport`] answering from a closure, without any byte stream.
pub struct FakeTransport {
    responder: Box<Responder>,
    namespace: Option<Arc<Namespace>>,
    calls: Mutex<Vec<Box<dyn BinaryObject>>>,
}

impl FakeTransport {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&dyn BinaryObject) -> Result<Box<dyn BinaryObject>> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            namespace: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Pass every call and reply through an encode/decode cycle with
    /// `namespace`, so unregistered types fail as they would on the wire.
    pub fn with_namespace(mut self, namespace: Arc<Namespace>) -> Self {
        self.namespace = Some(namespace);
        self
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<Box<dyn BinaryObject>> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Wire names of every call received so far, in order.
    pub fn call_names(&self) -> Vec<&'static str> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|call| call.class().name())
            .collect()
    }

    fn round_trip(&self, obj: Box<dyn BinaryObject>) -> Result<Box<dyn BinaryObject>> {
        match &self.namespace {
            Some(ns) => decode_object(ns, encode_object(ns, obj.as_ref())?),
            None => Ok(obj),
        }
    }
}

impl Transport for FakeTransport {
    async fn send(&self, call: Box<dyn BinaryObject>) -> Result<Box<dyn BinaryObject>> {
        let call = self.round_trip(call)?;
        let reply = (self.responder)(call.as_ref());
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call);
        self.round_trip(reply?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rpclib_core::any::{register_builtins, StringBox, Uint32Box};

    fn namespace() -> Arc<Namespace> {
        let ns = Namespace::new();
        register_builtins(&ns).unwrap();
        Arc::new(ns)
    }

    #[tokio::test]
    async fn test_fake_server_echoes() {
        let server = FakeServer::new(namespace(), |call| async move { ServerReply::Object(call) });
        let (client, handle) = server.connect(BroadcasterConfig::default()).await.unwrap();

        let reply = client
            .send(Box::new(Uint32Box { value: 11 }))
            .await
            .unwrap();
        assert_eq!(reply.downcast_ref::<Uint32Box>(), Some(&Uint32Box { value: 11 }));
        assert_eq!(handle.received(), 1);
        assert_eq!(handle.handshake_version(), Some(1));
    }

    #[tokio::test]
    async fn test_fake_transport_records_calls() {
        let transport = FakeTransport::new(|_| {
            Ok(Box::new(StringBox {
                value: "ok".into(),
            }))
        })
        .with_namespace(namespace());

        let reply = transport
            .send(Box::new(Uint32Box { value: 1 }))
            .await
            .unwrap();
        assert!(reply.is::<StringBox>());
        assert_eq!(transport.call_names(), vec!["any.uint32"]);
    }
}
