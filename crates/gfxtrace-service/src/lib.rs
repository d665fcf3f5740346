//! # gfxtrace-service - Replay Service Client
//!
//! Typed client for the graphics-trace replay service. Declares the wire
//! types the service speaks and wraps any [`rpclib_rpc::Transport`] in an
//! asynchronous, cancellable call API.
//!
//! ## Public API
//!
//! ### Client (`client`)
//! - [`ServiceClient`] - One method per service call
//! - [`ServiceClientRpc`] - Implementation over a transport
//! - [`CallHandle`], [`CallState`] - Per-call future and lifecycle
//!
//! ### Session (`session`)
//! - [`bootstrap()`] - Schema, features, string table, device, capture
//! - [`BootstrapTimeouts`], [`CaptureSource`], [`Session`]
//!
//! ### Wire types
//! - `path` - Addresses of server-side state ([`Path`], [`TypedPath`])
//! - `types` - Captures, devices, images, timing
//! - `schema` - Type descriptions published by the server
//! - `stringtable` - Localized messages
//! - `errors` - Error objects sent in place of a result
//! - `messages` - `Call*` / `Result*` pairs
//!
//! ### Registration (`namespace`)
//! - [`service_namespace()`] - Namespace with every type above

pub mod client;
pub mod errors;
pub mod messages;
pub mod namespace;
pub mod path;
pub mod schema;
pub mod session;
pub mod stringtable;
pub mod types;

pub use client::{CallHandle, CallState, ServiceClient, ServiceClientRpc};
pub use errors::remote_error;
pub use messages::{CallMessage, ResultMessage};
pub use namespace::{register_service_types, service_namespace};
pub use path::{
    ArrayIndexPath, AtomPath, AtomsPath, BlobPath, CapturePath, DevicePath, FieldPath,
    ImageInfoPath, MapIndexPath, Path, StatePath, TimingInfoPath, TypedPath,
};
pub use schema::Schema;
pub use session::{bootstrap, BootstrapTimeouts, CaptureSource, Session, FEATURE_STRING_TABLES};
pub use stringtable::{Info, Msg, StringTable};
pub use types::{Capture, Device, ImageInfo, RenderSettings, TimingFlags, TimingInfo};
