//! Asynchronous façade over the service methods.
//!
//! Every method builds its `Call*` struct, spawns one task on the runtime
//! that sends it and waits for the correlated reply, and returns a
//! [`CallHandle`] straight away. The handle is a future for the unwrapped
//! result and exposes the call's [`CallState`].
//!
//! ```text
//! Created ─▶ Submitted ─▶ Sent ─┬─▶ Completed
//!                               ├─▶ Failed
//!    (any non-terminal state) ──┴─▶ Cancelled
//! ```

use std::future::Future;
use std::panic::Location;
use std::pin::Pin;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use rpclib_core::prelude::*;
use rpclib_core::{BinaryObject, FromValue, Object, TypedObject, Value};
use rpclib_rpc::{Broadcaster, BroadcasterConfig, Transport};

use crate::errors::remote_error;
use crate::messages::*;
use crate::namespace::service_namespace;
use crate::path::{AtomPath, CapturePath, DevicePath, ImageInfoPath, Path, TimingInfoPath, TypedPath};
use crate::schema::Schema;
use crate::stringtable::{Info, StringTable};
use crate::types::{RenderSettings, TimingFlags};

// ─────────────────────────────────────────────────────────────────
// Call state
// ─────────────────────────────────────────────────────────────────

/// Lifecycle of a single call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum CallState {
    /// Request built, not yet handed to the runtime.
    Created = 0,
    /// Task spawned.
    Submitted = 1,
    /// Request handed to the transport, awaiting the reply.
    Sent = 2,
    Completed = 3,
    Failed = 4,
    Cancelled = 5,
}

impl CallState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => CallState::Created,
            1 => CallState::Submitted,
            2 => CallState::Sent,
            3 => CallState::Completed,
            4 => CallState::Failed,
            _ => CallState::Cancelled,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            CallState::Completed | CallState::Failed | CallState::Cancelled
        )
    }
}

/// Atomically updated [`CallState`] shared by a handle and its task.
#[derive(Debug)]
struct StateCell(AtomicU8);

impl StateCell {
    fn new() -> Self {
        Self(AtomicU8::new(CallState::Created as u8))
    }

    fn get(&self) -> CallState {
        CallState::from_u8(self.0.load(Ordering::SeqCst))
    }

    /// Move forward to `next`. Returns `false` if the call already reached a
    /// terminal state or is already at or past `next`.
    fn advance(&self, next: CallState) -> bool {
        let mut current = self.0.load(Ordering::SeqCst);
        loop {
            let state = CallState::from_u8(current);
            if state.is_terminal() || state >= next {
                return false;
            }
            match self
                .0
                .compare_exchange(current, next as u8, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// CallHandle
// ─────────────────────────────────────────────────────────────────

/// A pending call. Await it for the result.
///
/// Dropping the handle detaches the call; [`CallHandle::cancel`] stops it.
#[must_use = "a call handle does nothing unless awaited or cancelled"]
pub struct CallHandle<T> {
    method: &'static str,
    state: Arc<StateCell>,
    task: JoinHandle<Result<T>>,
}

impl<T> CallHandle<T> {
    pub fn method(&self) -> &'static str {
        self.method
    }

    pub fn state(&self) -> CallState {
        self.state.get()
    }

    /// Cancel the call. A reply that arrives afterwards is discarded and the
    /// handle resolves to [`Error::Cancelled`]. Has no effect once the call
    /// has completed or failed.
    pub fn cancel(&self) {
        if self.state.advance(CallState::Cancelled) {
            debug!("Cancelled {}", self.method);
            self.task.abort();
        }
    }

    /// Wait at most `after` for the result, cancelling the call on expiry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Timeout`] if the deadline passes first.
    pub async fn wait_timeout(self, after: Duration) -> Result<T> {
        let method = self.method;
        let state = Arc::clone(&self.state);
        let abort = self.task.abort_handle();
        match tokio::time::timeout(after, self).await {
            Ok(result) => result,
            Err(_) => {
                state.advance(CallState::Cancelled);
                abort.abort();
                warn!("{} timed out after {:?}", method, after);
                Err(Error::Timeout { method, after })
            }
        }
    }
}

impl<T> std::fmt::Debug for CallHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallHandle")
            .field("method", &self.method)
            .field("state", &self.state())
            .finish()
    }
}

impl<T> Future for CallHandle<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.state.get() == CallState::Cancelled {
            return Poll::Ready(Err(Error::Cancelled));
        }
        match Pin::new(&mut self.task).poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Ok(_)) if self.state.get() == CallState::Cancelled => {
                Poll::Ready(Err(Error::Cancelled))
            }
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(e)) if e.is_cancelled() => Poll::Ready(Err(Error::Cancelled)),
            Poll::Ready(Err(e)) => {
                self.state.advance(CallState::Failed);
                Poll::Ready(Err(Error::transport(format!(
                    "{} task panicked: {e}",
                    self.method
                ))))
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// ServiceClient
// ─────────────────────────────────────────────────────────────────

/// The replay service's methods.
///
/// Each method returns immediately; failures surface when the handle is
/// awaited and name the line that issued the call.
pub trait ServiceClient: Send + Sync {
    /// Resolve `p` to the path it links to.
    #[track_caller]
    fn follow(&self, p: &dyn Path) -> CallHandle<Object>;

    #[track_caller]
    fn get(&self, p: &dyn Path) -> CallHandle<Value>;

    /// `get` for a path whose value type is statically known.
    #[track_caller]
    fn get_typed<P: TypedPath>(&self, p: &P) -> CallHandle<P::Output>
    where
        Self: Sized;

    /// Store `v` at `p`, returning the path of the modified state.
    #[track_caller]
    fn set(&self, p: &dyn Path, v: Value) -> CallHandle<Object>;

    #[track_caller]
    fn get_available_string_tables(&self) -> CallHandle<Vec<Info>>;

    #[track_caller]
    fn get_captures(&self) -> CallHandle<Vec<CapturePath>>;

    #[track_caller]
    fn get_devices(&self) -> CallHandle<Vec<DevicePath>>;

    #[track_caller]
    fn get_features(&self) -> CallHandle<Vec<String>>;

    #[track_caller]
    fn get_framebuffer_color(
        &self,
        device: &DevicePath,
        after: &AtomPath,
        settings: &RenderSettings,
    ) -> CallHandle<ImageInfoPath>;

    #[track_caller]
    fn get_framebuffer_depth(&self, device: &DevicePath, after: &AtomPath)
        -> CallHandle<ImageInfoPath>;

    #[track_caller]
    fn get_schema(&self) -> CallHandle<Schema>;

    #[track_caller]
    fn get_string_table(&self, info: &Info) -> CallHandle<StringTable>;

    #[track_caller]
    fn get_timing_info(
        &self,
        device: &DevicePath,
        capture: &CapturePath,
        flags: TimingFlags,
    ) -> CallHandle<TimingInfoPath>;

    /// Upload a capture held in memory.
    #[track_caller]
    fn import_capture(&self, name: &str, data: Bytes) -> CallHandle<CapturePath>;

    /// Load a capture from a file the server can read.
    #[track_caller]
    fn load_capture(&self, path: &str) -> CallHandle<CapturePath>;
}

// ─────────────────────────────────────────────────────────────────
// ServiceClientRpc
// ─────────────────────────────────────────────────────────────────

/// [`ServiceClient`] over any [`Transport`].
pub struct ServiceClientRpc<T> {
    transport: Arc<T>,
    runtime: Handle,
}

impl<T> Clone for ServiceClientRpc<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            runtime: self.runtime.clone(),
        }
    }
}

impl<T> std::fmt::Debug for ServiceClientRpc<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceClientRpc").finish_non_exhaustive()
    }
}

impl<T: Transport + Sync + 'static> ServiceClientRpc<T> {
    /// Build a client whose calls run on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when called outside a runtime.
    pub fn new(transport: T) -> Result<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| Error::config(format!("no tokio runtime for service calls: {e}")))?;
        Ok(Self::with_runtime(transport, runtime))
    }

    pub fn with_runtime(transport: T, runtime: Handle) -> Self {
        Self {
            transport: Arc::new(transport),
            runtime,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    #[track_caller]
    fn submit<C>(&self, call: C) -> CallHandle<<C::Result as ResultMessage>::Value>
    where
        C: CallMessage,
    {
        self.submit_with(call, Ok)
    }

    /// Spawn the round trip for `call`, converting the unwrapped result
    /// with `convert`.
    #[track_caller]
    fn submit_with<C, U, F>(&self, call: C, convert: F) -> CallHandle<U>
    where
        C: CallMessage,
        U: Send + 'static,
        F: FnOnce(<C::Result as ResultMessage>::Value) -> Result<U> + Send + 'static,
    {
        let location = Location::caller();
        let state = Arc::new(StateCell::new());
        let task_state = Arc::clone(&state);
        let transport = Arc::clone(&self.transport);

        state.advance(CallState::Submitted);
        let task = self.runtime.spawn(async move {
            task_state.advance(CallState::Sent);
            trace!("{} sent from {}", C::METHOD, location);

            let result = match Transport::send(&*transport, Box::new(call)).await {
                Ok(reply) => {
                    unpack_reply::<C::Result>(reply).and_then(|r| convert(r.into_value()))
                }
                Err(e) => Err(e),
            };

            match &result {
                Ok(_) => {
                    task_state.advance(CallState::Completed);
                }
                Err(e) => {
                    debug!("{} failed: {}", C::METHOD, e);
                    task_state.advance(CallState::Failed);
                }
            }
            result.map_err(|e| e.at_call_site(C::METHOD, location))
        });

        CallHandle {
            method: C::METHOD,
            state,
            task,
        }
    }
}

impl ServiceClientRpc<Broadcaster> {
    /// Handshake over `reader`/`writer` and return a client using a
    /// namespace with every service type registered.
    pub async fn connect<R, W>(reader: R, writer: W, config: BroadcasterConfig) -> Result<Self>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let namespace = Arc::new(service_namespace()?);
        let broadcaster = Broadcaster::connect(reader, writer, config, namespace).await?;
        Self::new(broadcaster)
    }
}

/// Take the typed result out of a reply, or map a server error object.
fn unpack_reply<R: ResultMessage>(reply: Box<dyn BinaryObject>) -> Result<R> {
    if reply.is::<R>() {
        return reply.downcast::<R>().map(|r| *r);
    }
    if let Some(remote) = remote_error(reply.as_ref()) {
        return Err(Error::Remote(remote));
    }
    Err(Error::type_mismatch(
        R::binary_class().name(),
        reply.class().name(),
    ))
}

impl<T: Transport + Sync + 'static> ServiceClient for ServiceClientRpc<T> {
    #[track_caller]
    fn follow(&self, p: &dyn Path) -> CallHandle<Object> {
        self.submit(CallFollow {
            p: Some(p.clone_object()),
        })
    }

    #[track_caller]
    fn get(&self, p: &dyn Path) -> CallHandle<Value> {
        self.submit(CallGet {
            p: Some(p.clone_object()),
        })
    }

    #[track_caller]
    fn get_typed<P: TypedPath>(&self, p: &P) -> CallHandle<P::Output> {
        self.submit_with(
            CallGet {
                p: Some(p.clone_object()),
            },
            <P::Output as FromValue>::from_value,
        )
    }

    #[track_caller]
    fn set(&self, p: &dyn Path, v: Value) -> CallHandle<Object> {
        self.submit(CallSet {
            p: Some(p.clone_object()),
            v,
        })
    }

    #[track_caller]
    fn get_available_string_tables(&self) -> CallHandle<Vec<Info>> {
        self.submit(CallGetAvailableStringTables {})
    }

    #[track_caller]
    fn get_captures(&self) -> CallHandle<Vec<CapturePath>> {
        self.submit(CallGetCaptures {})
    }

    #[track_caller]
    fn get_devices(&self) -> CallHandle<Vec<DevicePath>> {
        self.submit(CallGetDevices {})
    }

    #[track_caller]
    fn get_features(&self) -> CallHandle<Vec<String>> {
        self.submit(CallGetFeatures {})
    }

    #[track_caller]
    fn get_framebuffer_color(
        &self,
        device: &DevicePath,
        after: &AtomPath,
        settings: &RenderSettings,
    ) -> CallHandle<ImageInfoPath> {
        self.submit(CallGetFramebufferColor {
            device: device.clone(),
            after: after.clone(),
            settings: settings.clone(),
        })
    }

    #[track_caller]
    fn get_framebuffer_depth(
        &self,
        device: &DevicePath,
        after: &AtomPath,
    ) -> CallHandle<ImageInfoPath> {
        self.submit(CallGetFramebufferDepth {
            device: device.clone(),
            after: after.clone(),
        })
    }

    #[track_caller]
    fn get_schema(&self) -> CallHandle<Schema> {
        self.submit(CallGetSchema {})
    }

    #[track_caller]
    fn get_string_table(&self, info: &Info) -> CallHandle<StringTable> {
        self.submit(CallGetStringTable { info: info.clone() })
    }

    #[track_caller]
    fn get_timing_info(
        &self,
        device: &DevicePath,
        capture: &CapturePath,
        flags: TimingFlags,
    ) -> CallHandle<TimingInfoPath> {
        self.submit(CallGetTimingInfo {
            device: device.clone(),
            capture: capture.clone(),
            flags,
        })
    }

    #[track_caller]
    fn import_capture(&self, name: &str, data: Bytes) -> CallHandle<CapturePath> {
        self.submit(CallImportCapture {
            name: name.to_string(),
            data,
        })
    }

    #[track_caller]
    fn load_capture(&self, path: &str) -> CallHandle<CapturePath> {
        self.submit(CallLoadCapture {
            path: path.to_string(),
        })
    }
}
