//! Host system view
//!
//! A backend mount does not know on its own whether it may write to
//! storage: a mount replicated to a performance secondary must not, a
//! local mount always may. The host hands the backend this view at mount
//! time.

use serde::{Deserialize, Serialize};

/// Replication role of the node a mount lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplicationState {
    /// Replication not configured.
    #[default]
    Disabled,
    /// Authoritative node of a replication group.
    Primary,
    /// Read-only replica; not authoritative for writes.
    PerformanceSecondary,
}

/// What the host tells a backend about the mount it is serving.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemView {
    /// Mount is local to this node and excluded from replication.
    pub local_mount: bool,
    pub replication_state: ReplicationState,
}

impl SystemView {
    pub fn new(local_mount: bool, replication_state: ReplicationState) -> Self {
        Self {
            local_mount,
            replication_state,
        }
    }

    /// Whether storage writes from this node will stick. Local mounts are
    /// always writable; replicated mounts only outside a performance
    /// secondary.
    pub fn authoritative_for_writes(&self) -> bool {
        self.local_mount || self.replication_state != ReplicationState::PerformanceSecondary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_view_is_writable() {
        assert!(SystemView::default().authoritative_for_writes());
    }

    #[test]
    fn performance_secondary_is_read_only() {
        let view = SystemView::new(false, ReplicationState::PerformanceSecondary);
        assert!(!view.authoritative_for_writes());
    }

    #[test]
    fn local_mount_overrides_replication_state() {
        let view = SystemView::new(true, ReplicationState::PerformanceSecondary);
        assert!(view.authoritative_for_writes());
    }

    #[test]
    fn primary_is_writable() {
        let view = SystemView::new(false, ReplicationState::Primary);
        assert!(view.authoritative_for_writes());
    }
}
