//! Mapping from rusb errors to the core error taxonomy.

use dacvol_core::OpenError;

/// Classify a failure during open/claim.
pub(crate) fn open_error(error: rusb::Error) -> OpenError {
    match error {
        rusb::Error::NoDevice | rusb::Error::NotFound => OpenError::DeviceVanished,
        rusb::Error::Access => OpenError::PermissionRevoked,
        rusb::Error::Busy => OpenError::AlreadyClaimed,
        other => OpenError::Usb(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn test_open_error_classification() {
        assert_matches!(open_error(rusb::Error::NoDevice), OpenError::DeviceVanished);
        assert_matches!(open_error(rusb::Error::NotFound), OpenError::DeviceVanished);
        assert_matches!(open_error(rusb::Error::Access), OpenError::PermissionRevoked);
        assert_matches!(open_error(rusb::Error::Busy), OpenError::AlreadyClaimed);
        assert_matches!(open_error(rusb::Error::Timeout), OpenError::Usb(_));
    }
}
