//! Content hashing utilities.

use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of arbitrary bytes.
#[must_use]
pub fn sha256_hex(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex(b"hello world"),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
        assert_ne!(sha256_hex(b"hello world"), sha256_hex(b"hello world!"));
    }
}
