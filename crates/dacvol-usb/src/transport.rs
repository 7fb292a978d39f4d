//! Vendor control transfer carrying the volume payload.

use std::time::Duration;

use dacvol_core::TransportError;
use rusb::{DeviceHandle, Direction, GlobalContext, Recipient, RequestType};
use tracing::debug;

/// "Set current" request on the dongle's vendor interface.
const REQUEST_SET_VOLUME: u8 = 0x01;
/// Volume selector in the high byte of wValue.
const VALUE_VOLUME: u16 = 0x0200;
/// wIndex addresses the control interface.
const INDEX_CONTROL_INTERFACE: u16 = 0x0000;
/// Transfer latency is bounded; the dongle answers well within this.
const TRANSFER_TIMEOUT: Duration = Duration::from_secs(1);

/// Issue the host-to-device transfer.
///
/// Never retries; failures are reported upward for the caller to decide.
pub(crate) fn send(
    handle: &DeviceHandle<GlobalContext>,
    payload: [u8; 2],
) -> Result<(), TransportError> {
    let request_type =
        rusb::request_type(Direction::Out, RequestType::Vendor, Recipient::Interface);

    let written = handle
        .write_control(
            request_type,
            REQUEST_SET_VOLUME,
            VALUE_VOLUME,
            INDEX_CONTROL_INTERFACE,
            &payload,
            TRANSFER_TIMEOUT,
        )
        .map_err(|error| match error {
            // libusb reports a transfer against an unclaimed interface
            // as NotFound.
            rusb::Error::NotFound => TransportError::NotClaimed,
            other => TransportError::IoFailure(other.to_string()),
        })?;

    if written != payload.len() {
        return Err(TransportError::IoFailure(format!(
            "short control write: {written} of {} bytes",
            payload.len()
        )));
    }

    debug!(payload = ?payload, "volume transfer complete");
    Ok(())
}
