//! # rpclib-rpc - Call Multiplexing
//!
//! Carries encoded call objects to a server and routes the replies back to
//! their callers. Depends on `rpclib-core` for the codec and error types.
//!
//! ## Public API
//!
//! - [`Transport`] - Async trait the typed client sends calls through
//! - [`Broadcaster`] - [`Transport`] over any duplex byte stream
//! - [`BroadcasterConfig`] - MTU and protocol version
//! - [`RequestTracker`] - Request id allocation and reply correlation
//! - [`frame`] - Handshake and frame encoding
//!
//! With the `test-helpers` feature, `test_utils` adds an in-process
//! `FakeServer` and a recording `FakeTransport`.

pub mod broadcaster;
pub mod frame;
pub mod tracker;
pub mod transport;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_utils;

pub use broadcaster::{
    Broadcaster, BroadcasterConfig, ConnectionState, DEFAULT_MTU, DEFAULT_PROTOCOL_VERSION,
};
pub use frame::Frame;
pub use tracker::{Reply, RequestTracker};
pub use transport::{LocalTransport, Transport};
