//! Volume token validation and encoding.

use std::fmt;
use std::str::FromStr;

use crate::error::VolumeError;

/// A validated 16-bit volume value, parsed from a 4-hex-digit token.
///
/// This is the boundary that rejects bad user input before any hardware
/// access is attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeToken(u16);

impl VolumeToken {
    /// Parse a textual token: exactly 4 hexadecimal characters,
    /// case-insensitive.
    ///
    /// # Errors
    /// Returns [`VolumeError::MalformedToken`] for any other input.
    pub fn parse(input: &str) -> Result<Self, VolumeError> {
        let bytes = input.as_bytes();
        // from_str_radix alone would accept a leading '+'.
        if bytes.len() != 4 || !bytes.iter().all(u8::is_ascii_hexdigit) {
            return Err(VolumeError::MalformedToken(input.to_string()));
        }
        let value = u16::from_str_radix(input, 16)
            .map_err(|_| VolumeError::MalformedToken(input.to_string()))?;
        Ok(Self(value))
    }

    /// Raw 16-bit value.
    #[must_use]
    pub fn value(self) -> u16 {
        self.0
    }

    /// The 2-byte big-endian payload the dongle expects.
    #[must_use]
    pub fn payload(self) -> [u8; 2] {
        self.0.to_be_bytes()
    }
}

impl FromStr for VolumeToken {
    type Err = VolumeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for VolumeToken {
    /// Renders the normalized (uppercase, zero-padded) token form.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X}", self.0)
    }
}
