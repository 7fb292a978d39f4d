//! Opening and claiming the dongle.

use dacvol_core::{DeviceDescriptor, DeviceOpener, OpenError, TransportError, VolumeLink};
use rusb::{Device, DeviceHandle, GlobalContext};
use tracing::{debug, info};

use crate::enumerate::devnode;
use crate::error::open_error;
use crate::transport;

/// Interface carrying the vendor volume control.
const CONTROL_INTERFACE: u8 = 0;

/// rusb-backed opener producing claimed volume links.
pub struct UsbDeviceOpener;

impl UsbDeviceOpener {
    /// Re-locate the enumerated device; it may have vanished since the
    /// snapshot was taken.
    fn locate(descriptor: &DeviceDescriptor) -> Result<Device<GlobalContext>, OpenError> {
        let devices = rusb::devices().map_err(open_error)?;
        for device in devices.iter() {
            let Ok(desc) = device.device_descriptor() else {
                continue;
            };
            if desc.vendor_id() == descriptor.vendor_id
                && desc.product_id() == descriptor.product_id
                && devnode(device.bus_number(), device.address()) == descriptor.system_name
            {
                return Ok(device);
            }
        }
        Err(OpenError::DeviceVanished)
    }
}

impl DeviceOpener for UsbDeviceOpener {
    fn open(&self, descriptor: &DeviceDescriptor) -> Result<Box<dyn VolumeLink>, OpenError> {
        let device = Self::locate(descriptor)?;
        let mut handle = device.open().map_err(open_error)?;

        // snd-usb-audio binds the dongle as a sound card; force it off the
        // control interface while we hold the claim.
        handle.set_auto_detach_kernel_driver(true).map_err(open_error)?;
        handle.claim_interface(CONTROL_INTERFACE).map_err(open_error)?;

        info!(device = %descriptor.system_name, interface = CONTROL_INTERFACE, "interface claimed");
        Ok(Box::new(UsbVolumeLink { handle, claimed: true }))
    }
}

/// An open handle with the control interface claimed.
///
/// The claim is released exactly once, on drop, whichever path drops the
/// session.
pub struct UsbVolumeLink {
    handle: DeviceHandle<GlobalContext>,
    claimed: bool,
}

impl VolumeLink for UsbVolumeLink {
    fn send_volume(&mut self, payload: [u8; 2]) -> Result<(), TransportError> {
        if !self.claimed {
            return Err(TransportError::NotClaimed);
        }
        transport::send(&self.handle, payload)
    }
}

impl Drop for UsbVolumeLink {
    fn drop(&mut self) {
        if self.claimed {
            self.claimed = false;
            if let Err(error) = self.handle.release_interface(CONTROL_INTERFACE) {
                // Nothing to do at this point; the handle close below
                // invalidates the claim anyway.
                debug!(error = %error, "interface release failed");
            }
        }
    }
}
