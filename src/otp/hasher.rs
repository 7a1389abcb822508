//! Salted one-way digests for OTP codes and candidate passwords.
//!
//! Digests are plain SHA-256 over `secret || salt`, rendered as lower-hex.
//! This is deliberately a fast hash: the codes it protects are short-lived
//! and guarded by attempt caps, not by work factor.

use rand::{Rng, RngCore, rngs::OsRng};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Digest a secret with its salt, returning a 64-char lower-hex string.
#[must_use]
pub fn digest(secret: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update(salt.as_bytes());
    hex::encode(hasher.finalize())
}

/// Compare two digests in constant time with respect to their content.
///
/// Length differences still short-circuit; digests produced by [`digest`]
/// are always the same length, so that never leaks anything useful.
#[must_use]
pub fn compare(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Generate a fresh per-secret salt (8 random bytes, hex-encoded).
#[must_use]
pub fn generate_salt() -> String {
    let mut bytes = [0u8; 8];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Generate a zero-padded decimal one-time code of `length` digits.
#[must_use]
pub fn generate_code(length: usize) -> String {
    (0..length)
        .map(|_| char::from(b'0' + OsRng.gen_range(0..10u8)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_deterministic() {
        let first = digest("1234", "salt");
        let second = digest("1234", "salt");
        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn digest_changes_with_any_input_byte() {
        let base = digest("1234", "salt");
        assert_ne!(base, digest("1235", "salt"));
        assert_ne!(base, digest("1234", "salu"));
    }

    #[test]
    fn compare_matches_equal_digests_only() {
        let a = digest("1234", "salt");
        let b = digest("1234", "salt");
        let c = digest("4321", "salt");
        assert!(compare(&a, &b));
        assert!(!compare(&a, &c));
        assert!(!compare(&a, &a[..32]));
    }

    #[test]
    fn salts_are_distinct() {
        let salts: std::collections::HashSet<String> = (0..32).map(|_| generate_salt()).collect();
        assert_eq!(salts.len(), 32);
        assert!(salts.iter().all(|salt| salt.len() == 16));
    }

    #[test]
    fn codes_are_decimal_and_fixed_length() {
        for length in [4usize, 5, 6] {
            let code = generate_code(length);
            assert_eq!(code.len(), length);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }
}
