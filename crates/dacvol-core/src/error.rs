//! Error types for the dacvol core.

use thiserror::Error;

/// Volume token validation failure.
///
/// Raised before any hardware is touched; a rejected token is never
/// partially applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VolumeError {
    #[error("malformed volume token {0:?} (expected exactly 4 hex digits)")]
    MalformedToken(String),
}

/// Device open/claim failure.
///
/// No session is created; the manager returns to idle and does not retry.
#[derive(Debug, Error)]
pub enum OpenError {
    #[error("device is no longer attached")]
    DeviceVanished,

    #[error("access to the device was denied")]
    PermissionRevoked,

    #[error("interface is claimed by another process")]
    AlreadyClaimed,

    #[error("USB error: {0}")]
    Usb(String),
}

/// Control transfer failure.
///
/// The session is kept; the caller decides whether to retry.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("control transfer failed: {0}")]
    IoFailure(String),

    #[error("interface claim lost")]
    NotClaimed,
}

/// Failure applying a volume token to the current session.
#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("no active device session")]
    NoActiveSession,

    #[error(transparent)]
    Volume(#[from] VolumeError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}
