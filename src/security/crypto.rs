//! Password hashing primitives.
//!
//! Credentials are stored as a PBKDF2 digest (1000 rounds, 64-byte key)
//! next to a random per-user salt, both hex-encoded. The digest algorithm
//! is selected by configuration so existing rows keep verifying after a
//! default change.

use std::str::FromStr;

use constant_time_eq::constant_time_eq;
use rand::RngCore;
use sha2::{Sha256, Sha512};

const PBKDF2_ROUNDS: u32 = 1000;
const DERIVED_KEY_LEN: usize = 64;
const SALT_LEN: usize = 16;

/// Supported digest algorithms for password hashing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashAlgo {
    #[default]
    Sha256,
    Sha512,
}

impl FromStr for HashAlgo {
    type Err = UnknownAlgo;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sha256" => Ok(HashAlgo::Sha256),
            "sha512" => Ok(HashAlgo::Sha512),
            other => Err(UnknownAlgo(other.to_string())),
        }
    }
}

/// Unrecognized hash algorithm name.
#[derive(Debug, thiserror::Error)]
#[error("unknown hash algorithm: {0}")]
pub struct UnknownAlgo(String);

/// Derive the hex digest of `data` under `salt`.
pub fn hash(algo: HashAlgo, data: &str, salt: &str) -> String {
    let mut derived = [0u8; DERIVED_KEY_LEN];
    match algo {
        HashAlgo::Sha256 => pbkdf2::pbkdf2_hmac::<Sha256>(
            data.as_bytes(),
            salt.as_bytes(),
            PBKDF2_ROUNDS,
            &mut derived,
        ),
        HashAlgo::Sha512 => pbkdf2::pbkdf2_hmac::<Sha512>(
            data.as_bytes(),
            salt.as_bytes(),
            PBKDF2_ROUNDS,
            &mut derived,
        ),
    }
    hex::encode(derived)
}

/// Compare `data` against a stored digest without leaking timing.
pub fn matches(algo: HashAlgo, data: &str, expected_hex: &str, salt: &str) -> bool {
    let computed = hash(algo, data, salt);
    constant_time_eq(computed.as_bytes(), expected_hex.as_bytes())
}

/// Fresh random salt, hex-encoded (32 chars).
pub fn generate_salt() -> String {
    let mut bytes = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic_per_salt() {
        let salt = "a1b2c3d4e5f60718";
        let first = hash(HashAlgo::Sha256, "secret", salt);
        let second = hash(HashAlgo::Sha256, "secret", salt);
        assert_eq!(first, second);
        assert_eq!(first.len(), DERIVED_KEY_LEN * 2);

        let other_salt = hash(HashAlgo::Sha256, "secret", "different-salt");
        assert_ne!(first, other_salt);
    }

    #[test]
    fn algorithms_produce_distinct_digests() {
        let salt = "a1b2c3d4e5f60718";
        assert_ne!(
            hash(HashAlgo::Sha256, "secret", salt),
            hash(HashAlgo::Sha512, "secret", salt)
        );
    }

    #[test]
    fn matches_accepts_correct_and_rejects_wrong_password() {
        let salt = generate_salt();
        let digest = hash(HashAlgo::Sha256, "correct horse", &salt);
        assert!(matches(HashAlgo::Sha256, "correct horse", &digest, &salt));
        assert!(!matches(HashAlgo::Sha256, "battery staple", &digest, &salt));
    }

    #[test]
    fn salt_is_hex_and_random() {
        let salt = generate_salt();
        assert_eq!(salt.len(), SALT_LEN * 2);
        assert!(salt.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(salt, generate_salt());
    }

    #[test]
    fn algo_names_parse() {
        assert_eq!("sha256".parse::<HashAlgo>().unwrap(), HashAlgo::Sha256);
        assert_eq!("sha512".parse::<HashAlgo>().unwrap(), HashAlgo::Sha512);
        assert!("md5".parse::<HashAlgo>().is_err());
    }
}
