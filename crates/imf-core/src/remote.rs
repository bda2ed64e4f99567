//! Remote-object abstraction over the platform's binder-style transport.
//!
//! Both directions go through [`RemoteObject::send_request`]: proxies call it
//! to reach the service, and the service calls it on the stubs the client
//! registered to push notifications back.

use std::sync::Arc;

use crate::parcel::Parcel;

/// Transport status for a peer whose hosting process has died.
pub const DEAD_OBJECT: i32 = -32;
/// Transport status for an op code the receiver does not implement.
pub const UNKNOWN_TRANSACTION: i32 = -74;
/// Transport status for a request whose body could not be read.
pub const BAD_REQUEST: i32 = -22;

/// Non-zero status returned by the transport itself (not by the service).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("transport status {0}")]
pub struct TransportError(pub i32);

/// Delivery mode for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOption {
    /// Block until the receiver has written its reply.
    Sync,
    /// Fire and forget; the reply parcel stays empty.
    Async,
}

/// Callback fired when the process hosting a remote object dies.
pub trait DeathRecipient: Send + Sync {
    fn on_remote_died(&self);
}

/// An object reachable through the transport, local or remote.
pub trait RemoteObject: Send + Sync {
    /// Interface descriptor the receiver enforces on incoming requests.
    fn descriptor(&self) -> &str;

    /// Deliver one request. `data` is positioned at its start; the receiver
    /// writes its reply into `reply`.
    fn send_request(
        &self,
        code: u32,
        data: &mut Parcel,
        reply: &mut Parcel,
        option: MessageOption,
    ) -> Result<(), TransportError>;

    /// Whether this handle refers to an object in another process.
    fn is_proxy(&self) -> bool {
        false
    }

    /// Register a death watch. Local objects never die out from under the
    /// caller, so they refuse registration.
    fn add_death_recipient(&self, _recipient: Arc<dyn DeathRecipient>) -> bool {
        false
    }
}

/// Registry of system services, looked up by numeric id.
pub trait SystemAbilityManager: Send + Sync {
    fn get_system_ability(&self, id: i32) -> Option<Arc<dyn RemoteObject>>;
}

/// Identity comparison for remote handles (data pointer only; vtables may
/// differ between codegen units).
pub fn same_object(a: &Arc<dyn RemoteObject>, b: &Arc<dyn RemoteObject>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const u8,
        Arc::as_ptr(b) as *const u8,
    )
}
