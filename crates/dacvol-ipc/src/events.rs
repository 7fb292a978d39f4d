//! IPC event types (daemon to client).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event sent from the daemon to subscribed clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Event type
    pub event: EventType,
    /// Event data
    pub data: Value,
}

/// Types of events that can be subscribed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// Dongle session established
    DeviceConnected,
    /// Dongle session released
    DeviceDisconnected,
    /// Waiting for device access to be granted
    PermissionPending,
    /// Device access denied
    PermissionDenied,
    /// Volume transfer succeeded
    VolumeApplied,
    /// Non-fatal error occurred
    Error,
}

/// Data for device lifecycle and permission events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceEventData {
    pub label: String,
}

/// `VolumeApplied` event data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeAppliedData {
    /// Normalized (uppercase) token form
    pub volume: String,
}

/// `Error` event data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorData {
    pub message: String,
}
