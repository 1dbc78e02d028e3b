// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Stable per-account device identifier.
//!
//! The vendor login protocol wants a `device_id` that stays constant across
//! sessions for the same account. It is an identifier, not a security
//! control; the vendor only uses it to correlate logins.

use sha2::{Digest, Sha256};

/// Derive the device fingerprint for an account email.
///
/// Returns a 128-bit digest as 32 lowercase hex characters. Deterministic
/// for the same email; no failure modes.
pub fn fingerprint(email: &str) -> String {
    let digest = Sha256::digest(email.as_bytes());
    hex::encode(&digest[..16])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_deterministic() {
        assert_eq!(fingerprint("a@b.com"), fingerprint("a@b.com"));
    }

    #[test]
    fn test_fingerprint_differs_per_email() {
        assert_ne!(fingerprint("a@b.com"), fingerprint("b@a.com"));
    }

    #[test]
    fn test_fingerprint_shape() {
        let fp = fingerprint("someone@example.com");
        assert_eq!(fp.len(), 32);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(fp, fp.to_lowercase());
    }
}
