//! Session lifecycle and volume application.
//!
//! [`SessionManager`] owns the single device session and drives it through
//! `Idle -> AwaitingPermission -> Connected`. Enumeration snapshots and
//! permission outcomes come in from the host; every transition happens
//! under one lock, so outcomes arriving from the platform cannot interleave
//! with a foreground apply or shutdown.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::descriptor::DeviceDescriptor;
use crate::error::{ApplyError, OpenError, TransportError};
use crate::permission::{PermissionGateway, PermissionOutcome};
use crate::volume::VolumeToken;

/// An open, claimed connection to the dongle.
///
/// Implementations must release the interface claim exactly once when
/// dropped, regardless of which exit path drops them.
pub trait VolumeLink: Send {
    /// Issue the vendor control transfer carrying `payload`.
    ///
    /// Must not retry internally; failures are reported upward for the
    /// caller to decide.
    ///
    /// # Errors
    /// Returns [`TransportError`] on any OS-level transfer failure or a
    /// lost interface claim.
    fn send_volume(&mut self, payload: [u8; 2]) -> Result<(), TransportError>;
}

/// Opens a descriptor into a transport-capable link.
pub trait DeviceOpener: Send + Sync {
    /// Open the device and claim its control interface, detaching any
    /// conflicting kernel driver.
    ///
    /// # Errors
    /// Returns [`OpenError`] if the device vanished, access was revoked
    /// between check and open, or the interface is claimed elsewhere.
    fn open(&self, descriptor: &DeviceDescriptor) -> Result<Box<dyn VolumeLink>, OpenError>;
}

/// A live device session.
///
/// Exclusively owned by the manager; at most one exists at a time. The
/// link's claim is released when the session is dropped.
pub struct Session {
    descriptor: DeviceDescriptor,
    link: Box<dyn VolumeLink>,
    interface_claimed: bool,
}

impl Session {
    #[must_use]
    pub fn descriptor(&self) -> &DeviceDescriptor {
        &self.descriptor
    }

    #[must_use]
    pub fn interface_claimed(&self) -> bool {
        self.interface_claimed
    }
}

enum State {
    Idle,
    AwaitingPermission(DeviceDescriptor),
    Connected(Session),
}

/// Externally visible session state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum SessionStatus {
    Idle,
    AwaitingPermission { label: String },
    Connected { label: String },
}

/// Transition side effects, reported so the host can surface them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    PermissionRequested(DeviceDescriptor),
    PermissionDenied(DeviceDescriptor),
    Connected(DeviceDescriptor),
    Disconnected(DeviceDescriptor),
    OpenFailed { descriptor: DeviceDescriptor, reason: String },
}

/// Owner of the device session state machine.
pub struct SessionManager {
    gateway: Box<dyn PermissionGateway>,
    opener: Box<dyn DeviceOpener>,
    state: Mutex<State>,
}

impl SessionManager {
    #[must_use]
    pub fn new(gateway: Box<dyn PermissionGateway>, opener: Box<dyn DeviceOpener>) -> Self {
        Self { gateway, opener, state: Mutex::new(State::Idle) }
    }

    /// Process an enumeration snapshot.
    ///
    /// The whole snapshot is scanned. For every descriptor matching the
    /// target: with permission already held, the device is opened directly
    /// (never passing through `AwaitingPermission`); without it, a
    /// permission request is issued and the manager waits for the outcome.
    pub fn scan(&self, snapshot: &[DeviceDescriptor]) -> Vec<SessionEvent> {
        let mut state = self.state.lock();
        let mut events = Vec::new();

        for descriptor in snapshot {
            if !descriptor.is_target() {
                continue;
            }
            match &*state {
                // Already connected to this exact device: nothing to do.
                State::Connected(session) if session.descriptor() == descriptor => continue,
                // Request already in flight for this device.
                State::AwaitingPermission(pending) if pending == descriptor => continue,
                _ => {}
            }

            if self.gateway.has_permission(descriptor) {
                events.extend(Self::open_into(&mut state, &*self.opener, descriptor));
            } else if matches!(&*state, State::Connected(_)) {
                // Don't tear down a working session for a device that may
                // never be granted.
                debug!(device = %descriptor.label(), "ignoring unpermitted device while a session is live");
            } else {
                info!(device = %descriptor.label(), "requesting device access");
                self.gateway.request_permission(descriptor);
                *state = State::AwaitingPermission(descriptor.clone());
                events.push(SessionEvent::PermissionRequested(descriptor.clone()));
            }
        }

        events
    }

    /// Consume an asynchronous permission outcome.
    ///
    /// Acts only while a request for the same device identity is pending;
    /// anything else is stale or duplicated and is silently dropped.
    pub fn handle_outcome(&self, outcome: PermissionOutcome) -> Vec<SessionEvent> {
        let mut state = self.state.lock();

        let pending = match &*state {
            State::AwaitingPermission(descriptor) => descriptor.clone(),
            _ => {
                debug!(device = %outcome.descriptor().label(), "dropping outcome with no pending request");
                return Vec::new();
            }
        };
        if !outcome.descriptor().same_identity(&pending) {
            debug!(device = %outcome.descriptor().label(), "dropping outcome for a different device");
            return Vec::new();
        }

        match outcome {
            PermissionOutcome::Granted(descriptor) => {
                if !descriptor.is_target() {
                    debug!(device = %descriptor.label(), "dropping grant for a non-target device");
                    return Vec::new();
                }
                Self::open_into(&mut state, &*self.opener, &descriptor)
            }
            PermissionOutcome::Denied(descriptor) => {
                info!(device = %descriptor.label(), "device access denied");
                *state = State::Idle;
                vec![SessionEvent::PermissionDenied(descriptor)]
            }
        }
    }

    /// Validate a volume token and send it to the connected device.
    ///
    /// Repeatable: a successful apply leaves the session connected, and a
    /// transport failure keeps it for retry.
    ///
    /// # Errors
    /// [`ApplyError::NoActiveSession`] outside `Connected`; a validation
    /// failure before any hardware is touched; or the transport failure.
    pub fn apply_volume(&self, token: &str) -> Result<VolumeToken, ApplyError> {
        let mut state = self.state.lock();
        let State::Connected(session) = &mut *state else {
            return Err(ApplyError::NoActiveSession);
        };

        let volume = VolumeToken::parse(token)?;
        session.link.send_volume(volume.payload())?;
        info!(device = %session.descriptor().label(), volume = %volume, "volume applied");
        Ok(volume)
    }

    /// Release any held session and return to idle.
    pub fn shutdown(&self) -> Vec<SessionEvent> {
        let mut state = self.state.lock();
        match std::mem::replace(&mut *state, State::Idle) {
            State::Connected(session) => {
                info!(device = %session.descriptor().label(), "closing device session");
                vec![SessionEvent::Disconnected(session.descriptor().clone())]
            }
            _ => Vec::new(),
        }
    }

    /// Snapshot of the current state.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        match &*self.state.lock() {
            State::Idle => SessionStatus::Idle,
            State::AwaitingPermission(descriptor) => {
                SessionStatus::AwaitingPermission { label: descriptor.label() }
            }
            State::Connected(session) => {
                SessionStatus::Connected { label: session.descriptor().label() }
            }
        }
    }

    /// Attempt to open `descriptor`, releasing any prior session first so
    /// a single claim exists at any moment. On failure the state is idle
    /// and no session exists.
    fn open_into(
        state: &mut State,
        opener: &dyn DeviceOpener,
        descriptor: &DeviceDescriptor,
    ) -> Vec<SessionEvent> {
        let mut events = Vec::new();

        if let State::Connected(old) = std::mem::replace(state, State::Idle) {
            info!(device = %old.descriptor().label(), "releasing previous session");
            events.push(SessionEvent::Disconnected(old.descriptor().clone()));
            drop(old);
        }

        match opener.open(descriptor) {
            Ok(link) => {
                info!(device = %descriptor.label(), "device session established");
                *state = State::Connected(Session {
                    descriptor: descriptor.clone(),
                    link,
                    interface_claimed: true,
                });
                events.push(SessionEvent::Connected(descriptor.clone()));
            }
            Err(error) => {
                warn!(device = %descriptor.label(), error = %error, "device open failed");
                events.push(SessionEvent::OpenFailed {
                    descriptor: descriptor.clone(),
                    reason: error.to_string(),
                });
            }
        }

        events
    }
}
