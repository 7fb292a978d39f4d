//! Permission contract with the host platform.

use crate::descriptor::DeviceDescriptor;

/// Outcome of an asynchronous permission request.
///
/// Delivered at an unspecified later time, on an unspecified task, and
/// matched back to the pending request by device identity. Late or
/// duplicate outcomes are dropped by the session manager, never treated
/// as errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionOutcome {
    Granted(DeviceDescriptor),
    Denied(DeviceDescriptor),
}

impl PermissionOutcome {
    /// The descriptor this outcome refers to.
    #[must_use]
    pub fn descriptor(&self) -> &DeviceDescriptor {
        match self {
            Self::Granted(descriptor) | Self::Denied(descriptor) => descriptor,
        }
    }
}

/// Access-control queries against the platform.
///
/// `request_permission` is fire-and-forget: at most one outcome per
/// request eventually arrives on the host's outcome channel, with no
/// ordering guarantee relative to other requests. `has_permission` may be
/// stale immediately after returning; the open attempt re-validates.
pub trait PermissionGateway: Send + Sync {
    fn has_permission(&self, descriptor: &DeviceDescriptor) -> bool;

    fn request_permission(&self, descriptor: &DeviceDescriptor);
}
