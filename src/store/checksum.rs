//! CRC32 checksums for persisted document records
//!
//! Checksums are written as `crc32:XXXXXXXX` (lowercase hex). Every read of a
//! record validates its checksum; a mismatch aborts the read.

use crc32fast::Hasher;

/// Computes a CRC32 checksum over the provided data.
pub fn compute_checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Formats a checksum as `crc32:XXXXXXXX`.
pub fn format_checksum(checksum: u32) -> String {
    format!("crc32:{:08x}", checksum)
}

/// Verifies `data` against a formatted checksum.
pub fn verify_formatted(data: &[u8], formatted: &str) -> bool {
    formatted
        .strip_prefix("crc32:")
        .and_then(|hex| u32::from_str_radix(hex, 16).ok())
        .map(|expected| compute_checksum(data) == expected)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_deterministic() {
        let data = b"document record";
        assert_eq!(compute_checksum(data), compute_checksum(data));
    }

    #[test]
    fn test_checksum_detects_corruption() {
        let mut data = vec![0x00, 0x01, 0x02, 0x03];
        let original = compute_checksum(&data);
        data[2] ^= 0x01;
        assert_ne!(original, compute_checksum(&data));
    }

    #[test]
    fn test_formatted_round_trip() {
        let data = b"payload";
        let formatted = format_checksum(compute_checksum(data));
        assert!(formatted.starts_with("crc32:"));
        assert_eq!(formatted.len(), "crc32:".len() + 8);
        assert!(verify_formatted(data, &formatted));
        assert!(!verify_formatted(b"payloaD", &formatted));
    }

    #[test]
    fn test_malformed_checksum_fails_verification() {
        assert!(!verify_formatted(b"x", "md5:abcd"));
        assert!(!verify_formatted(b"x", "crc32:zzzz"));
    }
}
