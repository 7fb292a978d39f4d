//! dacvol USB backend.
//!
//! rusb-based implementation of the core's hardware seams: enumeration
//! snapshots, opening and claiming the dongle's control interface, and the
//! vendor control transfer that carries the volume payload.

pub mod enumerate;
mod error;
pub mod session;
mod transport;

pub use enumerate::snapshot;
pub use session::UsbDeviceOpener;
