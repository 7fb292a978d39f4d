//! dacvol IPC - Unix socket protocol and client library.
//!
//! Line-delimited JSON between the daemon and its clients: request /
//! response envelopes in one direction, broadcast events in the other.

pub mod client;
pub mod error;
pub mod events;
pub mod messages;
pub mod server;

pub use client::IpcClient;
pub use error::{IpcError, IpcResult};
pub use events::{DeviceEventData, ErrorData, Event, EventType, VolumeAppliedData};
pub use messages::{ErrorInfo, Method, Request, Response, StatusSnapshot};
pub use server::IpcServer;

use std::path::PathBuf;

/// Default socket path.
///
/// `$XDG_RUNTIME_DIR/dacvol/daemon.sock`, falling back to
/// `/run/user/$UID/dacvol/daemon.sock`.
#[must_use]
#[allow(unsafe_code)] // libc::getuid() is safe to call
pub fn socket_path() -> PathBuf {
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        PathBuf::from(runtime_dir).join("dacvol/daemon.sock")
    } else {
        let uid = unsafe { libc::getuid() };
        PathBuf::from(format!("/run/user/{uid}/dacvol/daemon.sock"))
    }
}
