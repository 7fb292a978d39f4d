//! Linux device-node permission gateway.
//!
//! There is no permission dialog on Linux; access to the dongle appears
//! when the user installs a udev rule or joins the right group. This
//! gateway probes the usbfs node directly, and `request_permission` keeps
//! polling for a bounded window before giving up, posting the outcome on
//! the daemon's channel either way.

use std::fs::OpenOptions;
use std::time::Duration;

use dacvol_core::{DeviceDescriptor, PermissionGateway, PermissionOutcome};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Gateway backed by devnode access probes.
pub struct NodePermissionGateway {
    outcome_tx: mpsc::Sender<PermissionOutcome>,
    grant_window: Duration,
    poll_interval: Duration,
}

impl NodePermissionGateway {
    #[must_use]
    pub fn new(
        outcome_tx: mpsc::Sender<PermissionOutcome>,
        grant_window: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self { outcome_tx, grant_window, poll_interval }
    }

    /// Control transfers need the node writable, so probe read-write.
    fn node_accessible(descriptor: &DeviceDescriptor) -> bool {
        OpenOptions::new().read(true).write(true).open(&descriptor.system_name).is_ok()
    }
}

impl PermissionGateway for NodePermissionGateway {
    fn has_permission(&self, descriptor: &DeviceDescriptor) -> bool {
        Self::node_accessible(descriptor)
    }

    fn request_permission(&self, descriptor: &DeviceDescriptor) {
        let outcome_tx = self.outcome_tx.clone();
        let descriptor = descriptor.clone();
        let grant_window = self.grant_window;
        let poll_interval = self.poll_interval;

        tokio::spawn(async move {
            let deadline = tokio::time::Instant::now() + grant_window;
            loop {
                if Self::node_accessible(&descriptor) {
                    info!(device = %descriptor.label(), "device access granted");
                    let _ = outcome_tx.send(PermissionOutcome::Granted(descriptor)).await;
                    return;
                }
                if tokio::time::Instant::now() >= deadline {
                    debug!(device = %descriptor.label(), "device access did not appear in time");
                    let _ = outcome_tx.send(PermissionOutcome::Denied(descriptor)).await;
                    return;
                }
                tokio::time::sleep(poll_interval).await;
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use dacvol_core::{TARGET_PRODUCT_ID, TARGET_VENDOR_ID};

    use super::*;

    fn descriptor_at(path: &std::path::Path) -> DeviceDescriptor {
        DeviceDescriptor::new(
            TARGET_VENDOR_ID,
            TARGET_PRODUCT_ID,
            path.to_string_lossy().into_owned(),
        )
    }

    #[tokio::test]
    async fn test_has_permission_probes_the_node() {
        let dir = tempfile::tempdir().unwrap();
        let node = dir.path().join("004");
        std::fs::write(&node, b"").unwrap();

        let (tx, _rx) = mpsc::channel(4);
        let gateway =
            NodePermissionGateway::new(tx, Duration::from_secs(1), Duration::from_millis(10));

        assert!(gateway.has_permission(&descriptor_at(&node)));
        assert!(!gateway.has_permission(&descriptor_at(&dir.path().join("missing"))));
    }

    #[tokio::test]
    async fn test_request_grants_when_node_becomes_accessible() {
        let dir = tempfile::tempdir().unwrap();
        let node = dir.path().join("004");

        let (tx, mut rx) = mpsc::channel(4);
        let gateway =
            NodePermissionGateway::new(tx, Duration::from_secs(5), Duration::from_millis(10));

        let descriptor = descriptor_at(&node);
        gateway.request_permission(&descriptor);

        // Access appears while the request is pending.
        std::fs::write(&node, b"").unwrap();

        let outcome = rx.recv().await.unwrap();
        assert_eq!(outcome, PermissionOutcome::Granted(descriptor));
    }

    #[tokio::test]
    async fn test_request_denies_after_the_grant_window() {
        let dir = tempfile::tempdir().unwrap();
        let node = dir.path().join("missing");

        let (tx, mut rx) = mpsc::channel(4);
        let gateway =
            NodePermissionGateway::new(tx, Duration::from_millis(30), Duration::from_millis(10));

        let descriptor = descriptor_at(&node);
        gateway.request_permission(&descriptor);

        let outcome = rx.recv().await.unwrap();
        assert_eq!(outcome, PermissionOutcome::Denied(descriptor));
    }
}
