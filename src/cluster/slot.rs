//! Redis Cluster slot calculation.
//!
//! Redis Cluster maps every key to one of 16384 slots with CRC16 (XMODEM
//! variant) modulo 16384. Keys are raw bytes; no text decoding happens.

use crc::{Crc, CRC_16_XMODEM};

/// Number of hash slots in Redis Cluster.
pub const SLOT_COUNT: u16 = 16384;

const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

/// Calculates the Redis Cluster slot for a given key.
///
/// If the key contains a non-empty `{...}` section, only the bytes inside
/// the first such braces are hashed (hash tags).
///
/// # Examples
///
/// ```
/// use muxpipe::key_slot;
///
/// assert_eq!(key_slot("foo"), 12182);
/// assert_eq!(key_slot("{user1000}.following"), key_slot("{user1000}.followers"));
/// ```
pub fn key_slot(key: impl AsRef<[u8]>) -> u16 {
    let hash_key = extract_hash_tag(key.as_ref());
    CRC16.checksum(hash_key) % SLOT_COUNT
}

/// Returns the bytes to hash for `key`.
///
/// - `{user1000}.following` → `user1000`
/// - `foo{bar}{baz}` → `bar`
/// - `foo{}{bar}` → the whole key (first tag is empty)
/// - `foo{bar` → the whole key
fn extract_hash_tag(key: &[u8]) -> &[u8] {
    if let Some(start) = key.iter().position(|&b| b == b'{') {
        if let Some(len) = key[start + 1..].iter().position(|&b| b == b'}') {
            if len > 0 {
                return &key[start + 1..start + 1 + len];
            }
        }
    }
    key
}
