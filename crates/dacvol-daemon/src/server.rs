//! IPC request handling.
//!
//! Requests are dispatched against the session manager and the preference
//! store by the main loop, which owns both; the dispatch itself is pure
//! apart from those two.

use serde_json::{Value, json};
use tracing::{info, warn};

use dacvol_core::{ApplyError, SessionEvent, SessionManager, VolumeToken};
use dacvol_ipc::{
    DeviceEventData, ErrorInfo, Event, EventType, Method, StatusSnapshot, VolumeAppliedData,
};

use crate::prefs::PrefsStore;

/// What a request produced: the response, events to broadcast, and
/// whether the daemon should exit.
pub struct Outcome {
    pub result: Result<Value, ErrorInfo>,
    pub events: Vec<Event>,
    pub shutdown: bool,
}

impl Outcome {
    fn ok(value: Value) -> Self {
        Self { result: Ok(value), events: Vec::new(), shutdown: false }
    }

    fn err(code: i32, message: impl Into<String>) -> Self {
        Self { result: Err(ErrorInfo::new(code, message)), events: Vec::new(), shutdown: false }
    }
}

/// Build the status snapshot returned by `GetStatus`.
pub fn snapshot(manager: &SessionManager, prefs: &PrefsStore) -> StatusSnapshot {
    let saved = prefs.get();
    StatusSnapshot {
        status: manager.status(),
        volume: saved.volume.clone(),
        auto_apply: saved.auto_apply,
        quit_after_apply: saved.quit_after_apply,
    }
}

/// Handle one IPC request.
pub fn dispatch(method: &Method, manager: &SessionManager, prefs: &mut PrefsStore) -> Outcome {
    match method {
        Method::GetStatus => {
            Outcome::ok(serde_json::to_value(snapshot(manager, prefs)).unwrap_or(json!({})))
        }

        Method::ApplyVolume { volume } => match manager.apply_volume(volume) {
            Ok(token) => {
                // The original input is what the user sees next time, so
                // persist it as typed, not normalized.
                if let Err(error) = prefs.set_volume(volume) {
                    warn!(error = %error, "Failed to persist volume preference");
                }
                let mut outcome = Outcome::ok(json!({"volume": token.to_string()}));
                outcome.events.push(volume_applied_event(token));
                outcome
            }
            Err(error @ ApplyError::Volume(_)) => Outcome::err(400, error.to_string()),
            Err(error @ ApplyError::NoActiveSession) => Outcome::err(409, error.to_string()),
            Err(error @ ApplyError::Transport(_)) => Outcome::err(502, error.to_string()),
        },

        Method::SetAutoApply { enabled } => match prefs.set_auto_apply(*enabled) {
            Ok(()) => Outcome::ok(json!({"auto_apply": enabled})),
            Err(error) => Outcome::err(500, error.to_string()),
        },

        Method::SetQuitAfterApply { enabled } => match prefs.set_quit_after_apply(*enabled) {
            Ok(()) => Outcome::ok(json!({"quit_after_apply": enabled})),
            Err(error) => Outcome::err(500, error.to_string()),
        },

        // Subscriptions are per-connection state handled by the IPC
        // server; answer harmlessly if one slips through.
        Method::Subscribe { .. } => Outcome::ok(json!({"subscribed": true})),

        Method::Shutdown => {
            info!("Shutdown requested via IPC");
            let mut outcome = Outcome::ok(json!({"success": true}));
            outcome.shutdown = true;
            outcome
        }
    }
}

/// Map a session transition to its broadcast event.
#[must_use]
pub fn session_event_to_ipc(event: &SessionEvent) -> Event {
    match event {
        SessionEvent::Connected(descriptor) => {
            device_event(EventType::DeviceConnected, descriptor.label())
        }
        SessionEvent::Disconnected(descriptor) => {
            device_event(EventType::DeviceDisconnected, descriptor.label())
        }
        SessionEvent::PermissionRequested(descriptor) => {
            device_event(EventType::PermissionPending, descriptor.label())
        }
        SessionEvent::PermissionDenied(descriptor) => {
            device_event(EventType::PermissionDenied, descriptor.label())
        }
        SessionEvent::OpenFailed { descriptor, reason } => Event {
            event: EventType::Error,
            data: serde_json::to_value(dacvol_ipc::ErrorData {
                message: format!("{}: {reason}", descriptor.label()),
            })
            .unwrap_or_default(),
        },
    }
}

fn device_event(event: EventType, label: String) -> Event {
    Event {
        event,
        data: serde_json::to_value(DeviceEventData { label }).unwrap_or_default(),
    }
}

pub fn volume_applied_event(token: VolumeToken) -> Event {
    Event {
        event: EventType::VolumeApplied,
        data: serde_json::to_value(VolumeAppliedData { volume: token.to_string() })
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use dacvol_core::{
        DeviceDescriptor, DeviceOpener, OpenError, PermissionGateway, SessionStatus,
        TARGET_PRODUCT_ID, TARGET_VENDOR_ID, TransportError, VolumeLink,
    };

    use super::*;

    struct OpenGateway;

    impl PermissionGateway for OpenGateway {
        fn has_permission(&self, _descriptor: &DeviceDescriptor) -> bool {
            true
        }

        fn request_permission(&self, _descriptor: &DeviceDescriptor) {}
    }

    struct StubLink;

    impl VolumeLink for StubLink {
        fn send_volume(&mut self, _payload: [u8; 2]) -> Result<(), TransportError> {
            Ok(())
        }
    }

    struct StubOpener;

    impl DeviceOpener for StubOpener {
        fn open(&self, _descriptor: &DeviceDescriptor) -> Result<Box<dyn VolumeLink>, OpenError> {
            Ok(Box::new(StubLink))
        }
    }

    fn connected_manager() -> SessionManager {
        let manager = SessionManager::new(Box::new(OpenGateway), Box::new(StubOpener));
        manager.scan(&[DeviceDescriptor::new(
            TARGET_VENDOR_ID,
            TARGET_PRODUCT_ID,
            "/dev/bus/usb/001/004",
        )]);
        manager
    }

    fn idle_manager() -> SessionManager {
        SessionManager::new(Box::new(OpenGateway), Box::new(StubOpener))
    }

    fn prefs_in(dir: &tempfile::TempDir) -> PrefsStore {
        PrefsStore::load(dir.path().join("prefs.toml")).unwrap()
    }

    #[test]
    fn test_get_status_reports_session_and_prefs() {
        let dir = tempfile::tempdir().unwrap();
        let mut prefs = prefs_in(&dir);
        let manager = connected_manager();

        let outcome = dispatch(&Method::GetStatus, &manager, &mut prefs);

        let snapshot: StatusSnapshot = serde_json::from_value(outcome.result.unwrap()).unwrap();
        assert_eq!(snapshot.status, SessionStatus::Connected { label: "Apple Dongle".into() });
        assert_eq!(snapshot.volume, "007f");
    }

    #[test]
    fn test_apply_volume_persists_and_emits() {
        let dir = tempfile::tempdir().unwrap();
        let mut prefs = prefs_in(&dir);
        let manager = connected_manager();

        let outcome =
            dispatch(&Method::ApplyVolume { volume: "0a3c".into() }, &manager, &mut prefs);

        assert_eq!(outcome.result.unwrap(), json!({"volume": "0A3C"}));
        assert_eq!(prefs.get().volume, "0a3c");
        assert_matches!(outcome.events.as_slice(), [Event { event: EventType::VolumeApplied, .. }]);
    }

    #[test]
    fn test_apply_volume_without_session_is_a_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let mut prefs = prefs_in(&dir);
        let manager = idle_manager();

        let outcome =
            dispatch(&Method::ApplyVolume { volume: "007f".into() }, &manager, &mut prefs);

        assert_eq!(outcome.result.unwrap_err().code, 409);
        // The failed apply must not overwrite the saved token.
        assert_eq!(prefs.get().volume, "007f");
    }

    #[test]
    fn test_apply_volume_rejects_malformed_token() {
        let dir = tempfile::tempdir().unwrap();
        let mut prefs = prefs_in(&dir);
        let manager = connected_manager();

        let outcome =
            dispatch(&Method::ApplyVolume { volume: "12G4".into() }, &manager, &mut prefs);

        assert_eq!(outcome.result.unwrap_err().code, 400);
        assert!(outcome.events.is_empty());
    }

    #[test]
    fn test_set_auto_apply_persists() {
        let dir = tempfile::tempdir().unwrap();
        let mut prefs = prefs_in(&dir);
        let manager = idle_manager();

        let outcome = dispatch(&Method::SetAutoApply { enabled: true }, &manager, &mut prefs);

        assert!(outcome.result.is_ok());
        assert!(prefs.get().auto_apply);
    }

    #[test]
    fn test_shutdown_sets_the_flag() {
        let dir = tempfile::tempdir().unwrap();
        let mut prefs = prefs_in(&dir);
        let manager = idle_manager();

        let outcome = dispatch(&Method::Shutdown, &manager, &mut prefs);

        assert!(outcome.shutdown);
        assert!(outcome.result.is_ok());
    }

    #[test]
    fn test_session_events_map_to_broadcasts() {
        let descriptor =
            DeviceDescriptor::new(TARGET_VENDOR_ID, TARGET_PRODUCT_ID, "/dev/bus/usb/001/004");

        let event = session_event_to_ipc(&SessionEvent::Connected(descriptor.clone()));
        assert_eq!(event.event, EventType::DeviceConnected);
        assert_eq!(event.data["label"], "Apple Dongle");

        let event = session_event_to_ipc(&SessionEvent::OpenFailed {
            descriptor,
            reason: "device is no longer attached".into(),
        });
        assert_eq!(event.event, EventType::Error);
    }
}
