//! Domain errors the server sends in place of a result.
//!
//! Each is an ordinary registered wire object. The client never hands these
//! to callers directly: [`remote_error`] turns them into
//! [`RemoteError`] values carried by the crate's error type.

use rpclib_core::{binary_object, BinaryObject, Object, RemoteError};

use crate::stringtable::Msg;

binary_object! {
    /// The requested data cannot be produced; `transient` means a retry
    /// later may succeed.
    pub struct ErrDataUnavailable("service.ErrDataUnavailable") {
        pub reason: Object,
        pub transient: bool,
    }
}

binary_object! {
    pub struct ErrInvalidPath("service.ErrInvalidPath") {
        pub reason: Object,
        pub path: Object,
    }
}

binary_object! {
    pub struct ErrInvalidArgument("service.ErrInvalidArgument") {
        pub reason: Object,
    }
}

binary_object! {
    /// Failure outside the service's own error vocabulary.
    pub struct RpcError("rpc.Error") {
        pub message: String,
    }
}

/// Map a server error object to a [`RemoteError`]. Returns `None` for
/// anything that is not one of the error types above.
pub fn remote_error(obj: &dyn BinaryObject) -> Option<RemoteError> {
    if let Some(err) = obj.downcast_ref::<ErrDataUnavailable>() {
        return Some(RemoteError::DataUnavailable {
            reason: describe(&err.reason),
            transient: err.transient,
        });
    }
    if let Some(err) = obj.downcast_ref::<ErrInvalidPath>() {
        return Some(RemoteError::InvalidPath {
            reason: describe(&err.reason),
            path: describe(&err.path),
        });
    }
    if let Some(err) = obj.downcast_ref::<ErrInvalidArgument>() {
        return Some(RemoteError::InvalidArgument {
            reason: describe(&err.reason),
        });
    }
    if let Some(err) = obj.downcast_ref::<RpcError>() {
        return Some(RemoteError::Rpc {
            message: err.message.clone(),
        });
    }
    None
}

fn describe(obj: &Object) -> String {
    match obj.as_deref() {
        None => "<none>".to_string(),
        Some(obj) => match obj.downcast_ref::<Msg>() {
            Some(msg) => msg.to_string(),
            None => format!("{obj:?}"),
        },
    }
}
