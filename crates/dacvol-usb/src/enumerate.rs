//! Enumeration snapshots of attached USB devices.

use dacvol_core::DeviceDescriptor;
use tracing::debug;

/// Linux device node path for a bus/address pair.
///
/// This is what the permission gateway probes for access, so it must be
/// the real usbfs path.
pub(crate) fn devnode(bus: u8, address: u8) -> String {
    format!("/dev/bus/usb/{bus:03}/{address:03}")
}

/// Snapshot the currently attached devices.
///
/// Devices whose descriptors cannot be read are skipped; an enumeration
/// failure yields an empty snapshot rather than an error, since the next
/// rescan will retry anyway.
#[must_use]
pub fn snapshot() -> Vec<DeviceDescriptor> {
    let devices = match rusb::devices() {
        Ok(devices) => devices,
        Err(error) => {
            debug!(error = %error, "USB enumeration failed");
            return Vec::new();
        }
    };

    let mut attached = Vec::new();
    for device in devices.iter() {
        let Ok(descriptor) = device.device_descriptor() else {
            continue;
        };
        attached.push(DeviceDescriptor::new(
            descriptor.vendor_id(),
            descriptor.product_id(),
            devnode(device.bus_number(), device.address()),
        ));
    }
    attached
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_devnode_is_zero_padded() {
        assert_eq!(devnode(1, 4), "/dev/bus/usb/001/004");
        assert_eq!(devnode(12, 104), "/dev/bus/usb/012/104");
    }
}
