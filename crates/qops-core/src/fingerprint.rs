//! Content fingerprinting for change detection.

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 digest of `bytes`.
///
/// Two artifacts are considered semantically equal iff their payloads are
/// byte-equal, so callers rely on renderers producing canonical output
/// (stable key ordering, no timestamps) rather than on this function doing
/// any normalization itself.
pub fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push(hex_nibble((byte >> 4) & 0x0f));
        out.push(hex_nibble(byte & 0x0f));
    }
    out
}

fn hex_nibble(value: u8) -> char {
    match value {
        0..=9 => (b'0' + value) as char,
        _ => (b'a' + (value - 10)) as char,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_deterministic() {
        let a = fingerprint(b"hello world");
        let b = fingerprint(b"hello world");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn fingerprint_changes_with_a_single_byte() {
        let a = fingerprint(b"nginx:1.25");
        let b = fingerprint(b"nginx:1.26");
        assert_ne!(a, b);
    }

    #[test]
    fn fingerprint_of_empty_input_is_the_well_known_sha256_empty_digest() {
        let digest = fingerprint(b"");
        assert_eq!(
            digest,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
