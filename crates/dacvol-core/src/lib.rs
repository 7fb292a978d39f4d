//! dacvol core - device matching, volume encoding, and session lifecycle.
//!
//! This crate contains the hardware-independent logic shared between the
//! daemon and other components: identifying the targeted dongle, validating
//! and encoding volume tokens, and driving the device session through its
//! permission and connection states. Hardware access enters through the
//! [`DeviceOpener`] and [`VolumeLink`] traits.

pub mod descriptor;
pub mod error;
pub mod permission;
pub mod session;
pub mod volume;

pub use descriptor::{DeviceDescriptor, TARGET_PRODUCT_ID, TARGET_VENDOR_ID};
pub use error::{ApplyError, OpenError, TransportError, VolumeError};
pub use permission::{PermissionGateway, PermissionOutcome};
pub use session::{DeviceOpener, Session, SessionEvent, SessionManager, SessionStatus, VolumeLink};
pub use volume::VolumeToken;
