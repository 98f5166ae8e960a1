//! Cluster hash slot calculation.

use crc::{CRC_16_XMODEM, Crc};

/// The total number of hash slots in a cluster.
pub const NUM_SLOTS: u16 = 16384;

const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

/// Hash slot owning `key`.
///
/// A non-empty `{tag}` inside the key is hashed instead of the whole key,
/// so related keys can be forced into one slot.
pub fn key_slot(key: &[u8]) -> u16 {
    if let Some(start) = key.iter().position(|&b| b == b'{')
        && let Some(len) = key[start + 1..].iter().position(|&b| b == b'}')
        && len > 0
    {
        return CRC16.checksum(&key[start + 1..start + 1 + len]) % NUM_SLOTS;
    }
    CRC16.checksum(key) % NUM_SLOTS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_slot() {
        assert_eq!(key_slot(b"somekey"), 11058);
    }

    #[test]
    fn test_hash_tag_groups_keys() {
        assert_eq!(key_slot(b"user:{1000}:following"), key_slot(b"1000"));
        assert_eq!(key_slot(b"user:{1000}:followers"), key_slot(b"user:{1000}:following"));
    }

    #[test]
    fn test_empty_tag_hashes_whole_key() {
        assert_eq!(key_slot(b"foo{}bar"), CRC16.checksum(b"foo{}bar") % NUM_SLOTS);
    }
}
