//! IPC message types.

use dacvol_core::SessionStatus;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::events::EventType;

/// Request envelope sent from client to daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Unique request ID for matching responses
    pub id: u64,
    /// The method to invoke
    pub method: Method,
}

/// Response envelope sent from daemon to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Request ID this is responding to
    pub id: u64,
    /// Result of the request
    pub result: Result<Value, ErrorInfo>,
}

/// Error information in a response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Error code
    pub code: i32,
    /// Human-readable error message
    pub message: String,
}

impl ErrorInfo {
    #[must_use]
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }
}

/// Methods that can be invoked via IPC.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "params")]
pub enum Method {
    /// Get the daemon status snapshot
    GetStatus,
    /// Validate a volume token and apply it to the connected dongle
    ApplyVolume { volume: String },
    /// Persist the apply-on-connect flag
    SetAutoApply { enabled: bool },
    /// Persist the quit-after-apply flag
    SetQuitAfterApply { enabled: bool },
    /// Subscribe to event types (empty = all); handled by the server,
    /// never forwarded to the daemon loop
    Subscribe { events: Vec<EventType> },
    /// Request graceful shutdown
    Shutdown,
}

/// Daemon status returned by `GetStatus`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusSnapshot {
    /// Session state, with the device label when one is known
    pub status: SessionStatus,
    /// Last persisted volume token
    pub volume: String,
    /// Apply the persisted volume when the dongle connects
    pub auto_apply: bool,
    /// Exit after a successful auto-apply
    pub quit_after_apply: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_round_trips_through_json() {
        let request = Request { id: 7, method: Method::ApplyVolume { volume: "007f".into() } };

        let json = serde_json::to_string(&request).unwrap();
        let back: Request = serde_json::from_str(&json).unwrap();

        assert_eq!(back.id, 7);
        match back.method {
            Method::ApplyVolume { volume } => assert_eq!(volume, "007f"),
            other => panic!("unexpected method: {other:?}"),
        }
    }

    #[test]
    fn test_error_response_round_trips_through_json() {
        let response =
            Response { id: 3, result: Err(ErrorInfo::new(409, "no active device session")) };

        let json = serde_json::to_string(&response).unwrap();
        let back: Response = serde_json::from_str(&json).unwrap();

        assert_eq!(back.id, 3);
        let error = back.result.unwrap_err();
        assert_eq!(error.code, 409);
        assert_eq!(error.message, "no active device session");
    }

    #[test]
    fn test_status_snapshot_round_trips_through_json() {
        let snapshot = StatusSnapshot {
            status: SessionStatus::Connected { label: "Apple Dongle".into() },
            volume: "007f".into(),
            auto_apply: true,
            quit_after_apply: false,
        };

        let json = serde_json::to_value(&snapshot).unwrap();
        let back: StatusSnapshot = serde_json::from_value(json).unwrap();

        assert_eq!(back.status, SessionStatus::Connected { label: "Apple Dongle".into() });
        assert!(back.auto_apply);
    }
}
