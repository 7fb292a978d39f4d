//! Device identity and matching.

use serde::{Deserialize, Serialize};

/// Apple USB vendor ID.
pub const TARGET_VENDOR_ID: u16 = 0x05AC;
/// Apple USB-C headphone dongle product ID.
pub const TARGET_PRODUCT_ID: u16 = 0x110A;

/// A USB device as seen during enumeration.
///
/// Identity for matching purposes is the `(vendor_id, product_id)` pair.
/// `system_name` is the OS-assigned device node path
/// (`/dev/bus/usb/BBB/DDD` on Linux), used for display and for probing
/// node access; it does not participate in matching. Immutable once
/// enumerated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    pub vendor_id: u16,
    pub product_id: u16,
    pub system_name: String,
}

impl DeviceDescriptor {
    #[must_use]
    pub fn new(vendor_id: u16, product_id: u16, system_name: impl Into<String>) -> Self {
        Self { vendor_id, product_id, system_name: system_name.into() }
    }

    /// True iff this descriptor is the targeted dongle.
    ///
    /// Enumeration and permission-outcome handling both go through this
    /// one predicate.
    #[must_use]
    pub fn is_target(&self) -> bool {
        self.vendor_id == TARGET_VENDOR_ID && self.product_id == TARGET_PRODUCT_ID
    }

    /// True iff `other` names the same device identity.
    #[must_use]
    pub fn same_identity(&self, other: &Self) -> bool {
        self.vendor_id == other.vendor_id && self.product_id == other.product_id
    }

    /// Human-readable label for status output.
    ///
    /// Unpadded uppercase hex in the fallback form, matching what this
    /// tool has always displayed.
    #[must_use]
    pub fn label(&self) -> String {
        if self.is_target() {
            "Apple Dongle".to_string()
        } else {
            format!("vendorId: 0x{:X} productId:0x{:X}", self.vendor_id, self.product_id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(vendor_id: u16, product_id: u16) -> DeviceDescriptor {
        DeviceDescriptor::new(vendor_id, product_id, "/dev/bus/usb/001/004")
    }

    #[test]
    fn test_target_matches() {
        assert!(descriptor(0x05AC, 0x110A).is_target());
    }

    #[test]
    fn test_wrong_vendor_does_not_match() {
        assert!(!descriptor(0x05AD, 0x110A).is_target());
    }

    #[test]
    fn test_wrong_product_does_not_match() {
        assert!(!descriptor(0x05AC, 0x110B).is_target());
    }

    #[test]
    fn test_wrong_pair_does_not_match() {
        assert!(!descriptor(0x0FD9, 0x0070).is_target());
    }

    #[test]
    fn test_system_name_does_not_affect_identity() {
        let a = DeviceDescriptor::new(0x05AC, 0x110A, "/dev/bus/usb/001/004");
        let b = DeviceDescriptor::new(0x05AC, 0x110A, "/dev/bus/usb/002/007");
        assert!(a.same_identity(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn test_target_label() {
        assert_eq!(descriptor(0x05AC, 0x110A).label(), "Apple Dongle");
    }

    #[test]
    fn test_fallback_label_is_unpadded_uppercase_hex() {
        assert_eq!(descriptor(0x05AD, 0x110A).label(), "vendorId: 0x5AD productId:0x110A");
        assert_eq!(descriptor(0x0FD9, 0x0070).label(), "vendorId: 0xFD9 productId:0x70");
    }
}
