//! Request/response correlation

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use tokio::sync::oneshot;

use rpclib_core::prelude::*;
use rpclib_core::BinaryObject;

/// What a waiting caller eventually receives.
pub type Reply = Result<Box<dyn BinaryObject>>;

/// A request waiting for its reply
struct PendingRequest {
    reply_tx: oneshot::Sender<Reply>,
    created_at: Instant,
    description: &'static str,
}

/// Tracks pending requests and matches replies by id.
///
/// Each reply is delivered at most once: the entry is removed on first
/// completion, so a duplicate or late reply finds nothing to complete.
pub struct RequestTracker {
    next_id: AtomicU64,
    pending: Mutex<HashMap<u64, PendingRequest>>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Register a new pending request
    /// Returns (request_id, receiver for the reply)
    pub fn register(&self, description: &'static str) -> (u64, oneshot::Receiver<Reply>) {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();

        let pending = PendingRequest {
            reply_tx: tx,
            created_at: Instant::now(),
            description,
        };

        self.lock().insert(id, pending);

        (id, rx)
    }

    /// Deliver a reply to its waiting caller.
    ///
    /// Returns `false` if no request with `id` is pending (already
    /// completed, cancelled, or never issued).
    pub fn complete(&self, id: u64, reply: Reply) -> bool {
        let Some(pending) = self.lock().remove(&id) else {
            return false;
        };
        trace!(
            "Request {} ({}) completed after {:?}",
            id,
            pending.description,
            pending.created_at.elapsed()
        );
        // The caller may have stopped waiting; nothing to do then.
        let _ = pending.reply_tx.send(reply);
        true
    }

    /// Drop a pending request without replying.
    pub fn forget(&self, id: u64) -> bool {
        self.lock().remove(&id).is_some()
    }

    /// Fail every pending request, e.g. when the connection is lost.
    /// Returns how many were failed.
    pub fn fail_all(&self, make_error: impl Fn() -> Error) -> usize {
        let drained: Vec<_> = self.lock().drain().collect();
        let count = drained.len();
        for (id, req) in drained {
            debug!("Failing request {} ({})", id, req.description);
            let _ = req.reply_tx.send(Err(make_error()));
        }
        count
    }

    /// Get the number of pending requests
    pub fn pending_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<u64, PendingRequest>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for RequestTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RequestTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestTracker")
            .field("pending", &self.pending_count())
            .finish()
    }
}
