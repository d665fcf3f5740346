//! Multiplexes concurrent calls over a single duplex byte stream.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         Broadcaster                          │
//! │                                                              │
//! │  send() ──register──▶ RequestTracker ◀──complete── reader    │
//! │     │                                              task      │
//! │     └──frame──▶ mpsc queue ──▶ writer task ──▶ AsyncWrite    │
//! │                                                              │
//! │  AsyncRead ──▶ reader task: frame → decode → tracker         │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! A reply body that fails to decode fails only its own request. Losing the
//! stream fails every pending request and closes the broadcaster.

use std::sync::{Arc, RwLock};

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use rpclib_core::prelude::*;
use rpclib_core::{decode_object, encode_object, BinaryObject, Namespace};

use crate::frame::{self, Frame};
use crate::tracker::RequestTracker;
use crate::transport::Transport;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Default outgoing write chunk size in bytes.
pub const DEFAULT_MTU: usize = 1024;

/// Default protocol version sent in the handshake.
pub const DEFAULT_PROTOCOL_VERSION: u32 = 1;

/// Capacity of the outgoing frame queue (bounded, to apply backpressure).
const WRITE_QUEUE_CAPACITY: usize = 64;

/// Connection parameters for a [`Broadcaster`].
#[derive(Debug, Clone, PartialEq)]
pub struct BroadcasterConfig {
    /// Largest single write to the underlying stream. Raised to
    /// [`frame::MIN_MTU`] if smaller.
    pub mtu: usize,
    /// Protocol version announced in the handshake.
    pub version: u32,
}

impl Default for BroadcasterConfig {
    fn default() -> Self {
        Self {
            mtu: DEFAULT_MTU,
            version: DEFAULT_PROTOCOL_VERSION,
        }
    }
}

/// Current state of the underlying stream.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionState {
    /// Frames are flowing in both directions.
    Connected,
    /// The stream ended or failed; no further replies will arrive.
    Closed { reason: String },
}

// ---------------------------------------------------------------------------
// Broadcaster
// ---------------------------------------------------------------------------

/// State shared between the public handle and the background tasks.
struct Shared {
    tracker: RequestTracker,
    namespace: Arc<Namespace>,
    state: RwLock<ConnectionState>,
}

impl Shared {
    fn close(&self, reason: &str) {
        {
            let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
            if matches!(*state, ConnectionState::Closed { .. }) {
                return;
            }
            *state = ConnectionState::Closed {
                reason: reason.to_string(),
            };
        }
        let failed = self
            .tracker
            .fail_all(|| Error::transport(format!("connection closed: {reason}")));
        info!("Broadcaster closed ({}), failed {} pending requests", reason, failed);
    }

    fn is_closed(&self) -> bool {
        matches!(
            *self.state.read().unwrap_or_else(|e| e.into_inner()),
            ConnectionState::Closed { .. }
        )
    }
}

/// Clonable handle for issuing calls over one connection.
///
/// The background tasks stop once every handle is dropped: the writer sees
/// its queue close and shuts the stream down, after which the reader sees
/// end-of-stream.
#[derive(Clone)]
pub struct Broadcaster {
    write_tx: mpsc::Sender<Frame>,
    shared: Arc<Shared>,
}

impl std::fmt::Debug for Broadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broadcaster")
            .field("connection_state", &self.connection_state())
            .field("pending", &self.shared.tracker.pending_count())
            .finish()
    }
}

impl Broadcaster {
    /// Write the handshake on `writer`, then start the reader and writer
    /// tasks.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the handshake cannot be written.
    pub async fn connect<R, W>(
        reader: R,
        mut writer: W,
        config: BroadcasterConfig,
        namespace: Arc<Namespace>,
    ) -> Result<Self>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        frame::write_handshake(&mut writer, config.version)
            .await
            .context("Failed to write handshake")?;
        info!(
            "Handshake sent (protocol version {}, mtu {})",
            config.version, config.mtu
        );

        let (write_tx, write_rx) = mpsc::channel::<Frame>(WRITE_QUEUE_CAPACITY);
        let shared = Arc::new(Shared {
            tracker: RequestTracker::new(),
            namespace,
            state: RwLock::new(ConnectionState::Connected),
        });

        tokio::spawn(run_writer(
            writer,
            write_rx,
            config.mtu.max(frame::MIN_MTU),
            Arc::clone(&shared),
        ));
        tokio::spawn(run_reader(reader, Arc::clone(&shared)));

        Ok(Self { write_tx, shared })
    }

    /// Send `call` and wait for its reply.
    ///
    /// Dropping the returned future before it resolves forgets the pending
    /// request; a reply arriving afterwards is discarded.
    ///
    /// # Errors
    ///
    /// - [`Error::Unregistered`] if the call type is not in the namespace.
    /// - [`Error::Protocol`] if the encoded call exceeds
    ///   [`frame::MAX_BODY_SIZE`]. Other calls are unaffected.
    /// - [`Error::ChannelClosed`] if the connection is already closed.
    /// - [`Error::Transport`] if the connection is lost while waiting.
    /// - Any decode error for this reply's body.
    pub async fn send(&self, call: Box<dyn BinaryObject>) -> Result<Box<dyn BinaryObject>> {
        let name = call.class().name();
        let body = encode_object(&self.shared.namespace, call.as_ref())?;
        if body.len() > frame::MAX_BODY_SIZE {
            warn!("Refusing to send {} of {} bytes", name, body.len());
            return Err(Error::protocol(format!(
                "{name} request of {} bytes exceeds frame limit of {}",
                body.len(),
                frame::MAX_BODY_SIZE
            )));
        }

        let (id, reply_rx) = self.shared.tracker.register(name);
        let _pending = PendingGuard {
            tracker: &self.shared.tracker,
            id,
        };

        if self.shared.is_closed() {
            return Err(Error::ChannelClosed);
        }

        debug!("Sending request {} ({}, {} bytes)", id, name, body.len());
        self.write_tx
            .send(Frame { id, body })
            .await
            .map_err(|_| Error::ChannelClosed)?;

        reply_rx.await.map_err(|_| Error::ChannelClosed)?
    }

    /// Return the current connection state.
    pub fn connection_state(&self) -> ConnectionState {
        self.shared
            .state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Return `true` while replies can still arrive.
    pub fn is_connected(&self) -> bool {
        !self.shared.is_closed()
    }

    /// Number of calls awaiting a reply.
    pub fn pending_count(&self) -> usize {
        self.shared.tracker.pending_count()
    }

    pub fn namespace(&self) -> &Arc<Namespace> {
        &self.shared.namespace
    }
}

impl Transport for Broadcaster {
    async fn send(&self, call: Box<dyn BinaryObject>) -> Result<Box<dyn BinaryObject>> {
        Broadcaster::send(self, call).await
    }
}

/// Removes a pending entry when the waiting future goes away, whether it
/// completed or was dropped mid-flight.
struct PendingGuard<'a> {
    tracker: &'a RequestTracker,
    id: u64,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.tracker.forget(self.id) {
            debug!("Request {} abandoned before its reply arrived", self.id);
        }
    }
}

// ---------------------------------------------------------------------------
// Background tasks
// ---------------------------------------------------------------------------

async fn run_writer<W>(
    mut writer: W,
    mut write_rx: mpsc::Receiver<Frame>,
    mtu: usize,
    shared: Arc<Shared>,
) where
    W: AsyncWrite + Unpin,
{
    while let Some(frame) = write_rx.recv().await {
        // An unencodable frame fails only its own request.
        let raw = match frame::encode_frame(&frame) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Request {} not written: {}", frame.id, e);
                shared.tracker.complete(frame.id, Err(e));
                continue;
            }
        };
        if let Err(e) = frame::write_encoded(&mut writer, &raw, mtu).await {
            error!("Write of request {} failed: {}", frame.id, e);
            shared.close(&format!("write failed: {e}"));
            return;
        }
        trace!("Request {} written", frame.id);
    }

    debug!("All broadcaster handles dropped, shutting down writer");
    if let Err(e) = writer.shutdown().await {
        debug!("Writer shutdown failed: {}", e);
    }
}

async fn run_reader<R>(mut reader: R, shared: Arc<Shared>)
where
    R: AsyncRead + Unpin,
{
    loop {
        match frame::read_frame(&mut reader).await {
            Ok(Some(frame)) => dispatch_reply(&shared, frame),
            Ok(None) => {
                shared.close("end of stream");
                return;
            }
            Err(e) => {
                error!("Read failed: {}", e);
                shared.close(&format!("read failed: {e}"));
                return;
            }
        }
    }
}

/// Decode one reply and hand it to the request it answers.
fn dispatch_reply(shared: &Shared, frame: Frame) {
    let Frame { id, body } = frame;
    let reply = decode_object(&shared.namespace, body);
    if let Err(e) = &reply {
        warn!("Reply to request {} failed to decode: {}", id, e);
    }
    if !shared.tracker.complete(id, reply) {
        warn!("Discarding reply to unknown or cancelled request {}", id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rpclib_core::any::{register_builtins, StringBox, Uint32Box};
    use rpclib_core::TypedObject;
    use tokio::io::duplex;

    fn namespace() -> Arc<Namespace> {
        let ns = Namespace::new();
        register_builtins(&ns).unwrap();
        Arc::new(ns)
    }

    #[tokio::test]
    async fn test_handshake_then_frame_bytes() {
        let ns = namespace();
        let call = Uint32Box { value: 3 };
        let body = encode_object(&ns, &call).unwrap();
        let request = frame::encode_frame(&Frame { id: 1, body }).unwrap();

        let writer = tokio_test::io::Builder::new()
            .write(b"rpc0\x02\x00\x00\x00")
            .write(&request)
            .build();
        // Reader that never yields data, so the call stays pending.
        let (reader, _keep_open) = duplex(64);

        let config = BroadcasterConfig {
            mtu: 4096,
            version: 2,
        };
        let broadcaster = Broadcaster::connect(reader, writer, config, ns)
            .await
            .unwrap();
        let pending = tokio::spawn({
            let broadcaster = broadcaster.clone();
            async move { broadcaster.send(Box::new(call)).await }
        });

        // Give the writer a chance to drain the request.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(broadcaster.pending_count(), 1);
        pending.abort();
    }

    #[tokio::test]
    async fn test_send_after_close_is_channel_closed() {
        let ns = namespace();
        let (client, server) = duplex(1024);
        let (reader, writer) = tokio::io::split(client);
        let broadcaster = Broadcaster::connect(reader, writer, BroadcasterConfig::default(), ns)
            .await
            .unwrap();

        drop(server);
        while broadcaster.is_connected() {
            tokio::task::yield_now().await;
        }

        let err = broadcaster
            .send(Box::new(StringBox {
                value: "late".into(),
            }))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ChannelClosed | Error::Transport { .. }));
        assert_eq!(broadcaster.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_oversized_call_fails_alone() {
        use crate::test_utils::{FakeServer, ServerReply};
        use rpclib_core::any::BytesBox;

        let server = FakeServer::new(namespace(), |call| async move {
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            ServerReply::Object(call)
        });
        let (client, _handle) = server.connect(BroadcasterConfig::default()).await.unwrap();

        let pending = tokio::spawn({
            let client = client.clone();
            async move { client.send(Box::new(Uint32Box { value: 5 })).await }
        });
        tokio::task::yield_now().await;

        let big = BytesBox {
            value: bytes::Bytes::from(vec![0u8; frame::MAX_BODY_SIZE + 1]),
        };
        let err = client.send(Box::new(big)).await.unwrap_err();
        assert!(matches!(err, Error::Protocol { .. }));

        let reply = pending.await.unwrap().unwrap();
        assert_eq!(reply.downcast_ref::<Uint32Box>(), Some(&Uint32Box { value: 5 }));
        assert!(client.is_connected());
    }

    #[tokio::test]
    async fn test_writer_rejects_oversized_frame_without_closing() {
        let (client, _server) = duplex(1024);
        let (_reader, writer) = tokio::io::split(client);
        let shared = Arc::new(Shared {
            tracker: RequestTracker::new(),
            namespace: namespace(),
            state: RwLock::new(ConnectionState::Connected),
        });
        let (write_tx, write_rx) = mpsc::channel(1);
        let task = tokio::spawn(run_writer(writer, write_rx, DEFAULT_MTU, Arc::clone(&shared)));

        let (id, reply_rx) = shared.tracker.register("oversized");
        write_tx
            .send(Frame {
                id,
                body: bytes::Bytes::from(vec![0u8; frame::MAX_BODY_SIZE + 1]),
            })
            .await
            .unwrap();

        let err = reply_rx.await.unwrap().unwrap_err();
        assert!(matches!(err, Error::Protocol { .. }));
        assert!(!shared.is_closed());

        drop(write_tx);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_unregistered_call_is_rejected_before_sending() {
        let (client, _server) = duplex(1024);
        let (reader, writer) = tokio::io::split(client);
        let broadcaster = Broadcaster::connect(
            reader,
            writer,
            BroadcasterConfig::default(),
            Arc::new(Namespace::new()),
        )
        .await
        .unwrap();

        let err = broadcaster
            .send(Box::new(Uint32Box { value: 1 }))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unregistered { id, .. } if id == Uint32Box::binary_id()));
        assert_eq!(broadcaster.pending_count(), 0);
    }
}
