//! SHA256 checksums of migration SQL

use sha2::{Digest, Sha256};

pub fn compute_checksum(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_is_stable_hex() {
        let a = compute_checksum("CREATE TABLE t (x)");
        assert_eq!(a.len(), 64);
        assert_eq!(a, compute_checksum("CREATE TABLE t (x)"));
        assert_ne!(a, compute_checksum("CREATE TABLE t (y)"));
    }
}
