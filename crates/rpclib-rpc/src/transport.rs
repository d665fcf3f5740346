//! The seam between the typed client and whatever carries its messages.

use rpclib_core::prelude::*;
use rpclib_core::BinaryObject;

/// Carries one call object to the server and resolves to the reply object.
///
/// Implementations must support many concurrent `send`s and correlate each
/// reply with its own call.
#[trait_variant::make(Transport: Send)]
pub trait LocalTransport {
    async fn send(&self, call: Box<dyn BinaryObject>) -> Result<Box<dyn BinaryObject>>;
}
