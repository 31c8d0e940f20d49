//! Classification of Redis error replies.
//!
//! Cluster nodes answer with special errors when a key is not theirs:
//! - `MOVED <slot> <host>:<port>` - the slot lives on another node
//! - `ASK <slot> <host>:<port>` - the slot is being migrated
//! - `CLUSTERDOWN ...` - the cluster cannot serve requests
//! - `CROSSSLOT ...` - keys of one command hash to different slots

use crate::proto::error::Error;

/// Converts the text of an error reply into a typed [`Error`].
///
/// Redirects become [`Error::Moved`] / [`Error::Ask`]; a malformed redirect
/// and every other error reply become [`Error::Server`] carrying the
/// message verbatim.
pub fn parse_redis_error(error_msg: &[u8]) -> Error {
    let msg = String::from_utf8_lossy(error_msg);
    let msg = msg.trim();

    if let Some((slot, address)) = msg.strip_prefix("MOVED ").and_then(parse_redirect) {
        return Error::Moved { slot, address };
    }
    if let Some((slot, address)) = msg.strip_prefix("ASK ").and_then(parse_redirect) {
        return Error::Ask { slot, address };
    }
    if msg.starts_with("CLUSTERDOWN") {
        return Error::ClusterDown;
    }
    if msg.starts_with("CROSSSLOT") {
        return Error::CrossSlot;
    }

    Error::Server {
        message: msg.to_string(),
    }
}

/// Parses `"<slot> <host>:<port>"`.
fn parse_redirect(args: &str) -> Option<(u16, String)> {
    let mut parts = args.split_whitespace();
    let slot: u16 = parts.next()?.parse().ok()?;
    let address = parts.next()?.to_string();
    if parts.next().is_some() || slot >= super::slot::SLOT_COUNT {
        return None;
    }
    Some((slot, address))
}
