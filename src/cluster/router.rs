//! Slot routing.
//!
//! Pure functions from keys to the node that owns them in a given topology
//! snapshot. Nothing here performs I/O.

use bytes::Bytes;

use crate::proto::error::{Error, Result};

use super::slot::{key_slot, SLOT_COUNT};
use super::topology::{ClusterTopology, NodeAddr};

/// Where a command should be sent.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Route {
    /// By the slot of the command's keys; keyless commands go to any node.
    #[default]
    Auto,
    /// Any primary.
    Any,
    /// The primary owning this slot.
    Slot(u16),
    /// This primary.
    Node(NodeAddr),
}

/// Returns the single slot shared by `keys`.
///
/// `Ok(None)` for an empty key list; [`Error::CrossSlot`] if the keys hash
/// to different slots.
pub fn slot_for_keys<K: AsRef<[u8]>>(keys: &[K]) -> Result<Option<u16>> {
    let mut slots = keys.iter().map(|k| key_slot(k));
    let Some(first) = slots.next() else {
        return Ok(None);
    };
    if slots.any(|s| s != first) {
        return Err(Error::CrossSlot);
    }
    Ok(Some(first))
}

/// Returns the primary owning the slot of `keys`.
pub fn route<'a, K: AsRef<[u8]>>(topology: &'a ClusterTopology, keys: &[K]) -> Result<&'a NodeAddr> {
    let slot = slot_for_keys(keys)?.ok_or_else(|| Error::InvalidArgument {
        message: "cannot route a command without keys".to_string(),
    })?;
    topology
        .node_for_slot(slot)
        .ok_or(Error::SlotUnassigned { slot })
}

/// Resolves a route to an index into `topology.nodes()`.
///
/// `Ok(None)` means the command may go to any node.
pub(crate) fn route_index(
    topology: &ClusterTopology,
    keys: &[Bytes],
    route: &Route,
) -> Result<Option<usize>> {
    let slot = match route {
        Route::Auto => match slot_for_keys(keys)? {
            Some(slot) => slot,
            None => return Ok(None),
        },
        Route::Any => return Ok(None),
        Route::Slot(slot) if *slot >= SLOT_COUNT => {
            return Err(Error::InvalidArgument {
                message: format!("slot {} out of range", slot),
            })
        }
        Route::Slot(slot) => *slot,
        Route::Node(addr) => {
            return topology
                .node_index(addr)
                .map(Some)
                .ok_or_else(|| Error::InvalidArgument {
                    message: format!("{} is not a primary in the current topology", addr),
                })
        }
    };

    topology
        .node_index_for_slot(slot)
        .map(Some)
        .ok_or(Error::SlotUnassigned { slot })
}
