//! Argon2id-based keyed digest used as the secret-sharing checkpoint.
//!
//! This is not used to protect a user password: it is a deterministic,
//! salted digest of the master key, embedded as the `DIGEST_INDEX` point so
//! combine can tell a correct reconstruction from a corrupt one without any
//! other trusted channel.

use sodiumoxide::crypto::pwhash;

use crate::config::{PWHASH_MEMLIMIT, PWHASH_OPSLIMIT, PWHASH_OUTLEN};
use crate::error::{HorcruxError, Result};

/// `hsh(secret, salt) -> 32 bytes`, Argon2id with `opslimit = 2`,
/// `memlimit = 64 MiB`. Deterministic given the same inputs.
pub fn hsh(secret: &[u8], salt: &[u8]) -> Result<[u8; 32]> {
    let salt = pwhash::Salt::from_slice(salt)
        .ok_or_else(|| HorcruxError::Malformed("salt has wrong length for Argon2id".into()))?;

    let mut out = [0u8; PWHASH_OUTLEN];
    pwhash::derive_key(
        &mut out,
        secret,
        &salt,
        pwhash::OpsLimit(PWHASH_OPSLIMIT as usize),
        pwhash::MemLimit(PWHASH_MEMLIMIT),
    )
    .map_err(|_| HorcruxError::Malformed("argon2id key derivation failed".into()))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_given_same_inputs() {
        let secret = [7u8; 32];
        let salt = [3u8; 16];
        let a = hsh(&secret, &salt).unwrap();
        let b = hsh(&secret, &salt).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn depends_on_salt() {
        let secret = [7u8; 32];
        let a = hsh(&secret, &[1u8; 16]).unwrap();
        let b = hsh(&secret, &[2u8; 16]).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn depends_on_secret() {
        let salt = [9u8; 16];
        let a = hsh(&[1u8; 32], &salt).unwrap();
        let b = hsh(&[2u8; 32], &salt).unwrap();
        assert_ne!(a, b);
    }
}
