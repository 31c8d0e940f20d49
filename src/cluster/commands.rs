//! Cluster management commands used for topology discovery.

use crate::core::command::Cmd;

/// Creates a CLUSTER SLOTS command.
///
/// The reply lists every assigned slot range with its primary first and
/// replicas after it.
pub fn cluster_slots() -> Cmd {
    Cmd::new("CLUSTER").arg("SLOTS")
}
