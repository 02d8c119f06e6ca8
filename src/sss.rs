//! Shamir-style secret sharing over `GF(PRIME)` with an embedded digest
//! checkpoint.
//!
//! A split constructs a degree-`(K-1)` polynomial whose value at
//! `x = SECRET_INDEX` is the secret and whose value at `x = DIGEST_INDEX` is
//! a keyed hash of the secret, then hands out `f(0), f(1), ..., f(N-1)` as
//! the distributed shares. Combine needs `K` of those to re-derive the
//! polynomial, and uses the digest point to tell a correct reconstruction
//! from a corrupt one.

use num_bigint::BigUint;
use rand::RngCore;

use crate::error::{HorcruxError, Result};
use crate::field::{self, Point as FieldPoint};
use crate::pwhash;

/// `x` of the digest checkpoint; never handed out as a distributed share.
pub const DIGEST_INDEX: u16 = 254;

/// `x` of the secret itself; never handed out as a distributed share.
pub const SECRET_INDEX: u16 = 255;

/// Length in bytes of a split's salt / share id.
pub const SALT_LEN: usize = 16;

/// Length in bytes of the secret this module shares (the stream cipher's
/// master key).
pub const SECRET_LEN: usize = 32;

/// One distributed share: `(salt, threshold, point)`.
///
/// All shares produced by one [`split`] call carry the same `id` and
/// `threshold`; only `point` differs between them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Share {
    /// Salt shared by every share from one split; also the Argon2id salt.
    pub id: [u8; SALT_LEN],
    /// Minimum number of shares required to reconstruct.
    pub threshold: u8,
    /// This share's point on the sharing polynomial.
    pub point: FieldPoint,
}

fn be32(y: &BigUint) -> [u8; 32] {
    let bytes = y.to_bytes_be();
    let mut out = [0u8; 32];
    let start = 32 - bytes.len();
    out[start..].copy_from_slice(&bytes);
    out
}

/// Split `secret` (exactly [`SECRET_LEN`] bytes) into `n` shares, `k` of
/// which are required to reconstruct it.
///
/// `salt` is the per-split id; it is also used as the Argon2id salt for the
/// embedded digest checkpoint.
pub fn split(n: u8, k: u8, secret: &[u8; SECRET_LEN], salt: [u8; SALT_LEN]) -> Result<Vec<Share>> {
    if k < 2 {
        return Err(HorcruxError::InvalidParameters(format!(
            "threshold must be >= 2, got {k}"
        )));
    }
    if n < k {
        return Err(HorcruxError::InvalidParameters(format!(
            "n ({n}) must be >= threshold ({k})"
        )));
    }
    if n >= 254 {
        return Err(HorcruxError::InvalidParameters(format!(
            "n must be < 254, got {n}"
        )));
    }

    let digest = pwhash::hsh(secret, &salt)?;
    let y_digest = BigUint::from_bytes_be(&digest);
    let y_secret = BigUint::from_bytes_be(secret);

    let mut anchors: Vec<FieldPoint> = Vec::with_capacity(k as usize);
    let mut rng = rand::rngs::OsRng;
    for i in 0..(k - 2) {
        let mut buf = [0u8; 32];
        rng.fill_bytes(&mut buf);
        let y = BigUint::from_bytes_be(&buf) % field::prime();
        anchors.push(FieldPoint::new(i as u16, y));
    }
    anchors.push(FieldPoint::new(DIGEST_INDEX, y_digest));
    anchors.push(FieldPoint::new(SECRET_INDEX, y_secret));

    let mut shares = Vec::with_capacity(n as usize);
    for i in 0..n {
        let y = field::lagrange_interpolate(i as u16, &anchors)?;
        shares.push(Share {
            id: salt,
            threshold: k,
            point: FieldPoint::new(i as u16, y),
        });
    }
    Ok(shares)
}

/// Reconstruct the 32-byte secret from at least `threshold` of the shares
/// produced by one [`split`] call.
pub fn combine(shares: &[Share]) -> Result<[u8; SECRET_LEN]> {
    if shares.is_empty() {
        return Err(HorcruxError::NotEnoughShares {
            needed: 2,
            have: 0,
        });
    }
    let id = shares[0].id;
    let threshold = shares[0].threshold;
    if shares.iter().any(|s| s.id != id) {
        return Err(HorcruxError::IdMismatch);
    }

    let mut distinct: Vec<FieldPoint> = Vec::new();
    for s in shares {
        if !distinct.iter().any(|p| p.x == s.point.x) {
            distinct.push(s.point.clone());
        }
    }
    if distinct.len() < threshold as usize {
        return Err(HorcruxError::NotEnoughShares {
            needed: threshold,
            have: distinct.len(),
        });
    }
    let pts = &distinct[..threshold as usize];

    let y_secret = field::lagrange_interpolate(SECRET_INDEX, pts)?;
    let y_digest = field::lagrange_interpolate(DIGEST_INDEX, pts)?;

    let secret = be32(&y_secret);
    let expected_digest = pwhash::hsh(&secret, &id)?;
    if expected_digest != be32(&y_digest) {
        return Err(HorcruxError::InvalidDigest);
    }
    Ok(secret)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret_bytes(seed: u8) -> [u8; SECRET_LEN] {
        let mut s = [0u8; SECRET_LEN];
        for (i, b) in s.iter_mut().enumerate() {
            *b = seed.wrapping_add(i as u8);
        }
        s
    }

    #[test]
    fn split_and_recover_subset() {
        let secret = secret_bytes(7);
        let salt = [9u8; SALT_LEN];
        let shares = split(30, 5, &secret, salt).unwrap();
        assert_eq!(shares.len(), 30);

        let every_other: Vec<Share> = shares.iter().step_by(2).cloned().collect();
        let have: Vec<Share> = every_other[every_other.len() - 5..].to_vec();
        let recovered = combine(&have).unwrap();
        assert_eq!(recovered, secret);
    }

    #[test]
    fn not_enough_shares_fails() {
        let secret = secret_bytes(1);
        let salt = [1u8; SALT_LEN];
        let shares = split(5, 3, &secret, salt).unwrap();
        let have = shares[..2].to_vec();
        assert!(matches!(
            combine(&have),
            Err(HorcruxError::NotEnoughShares { .. })
        ));
    }

    #[test]
    fn tampered_share_fails_digest() {
        let secret = secret_bytes(3);
        let salt = [2u8; SALT_LEN];
        let mut shares = split(5, 3, &secret, salt).unwrap();
        let tampered_y = shares[0].point.y.clone() + BigUint::from(1u8);
        shares[0].point = FieldPoint::new(shares[0].point.x, tampered_y);
        let have = shares[..3].to_vec();
        assert!(matches!(combine(&have), Err(HorcruxError::InvalidDigest)));
    }

    #[test]
    fn mismatched_ids_rejected() {
        let secret = secret_bytes(4);
        let a = split(5, 3, &secret, [1u8; SALT_LEN]).unwrap();
        let b = split(5, 3, &secret, [2u8; SALT_LEN]).unwrap();
        let mixed = vec![a[0].clone(), b[1].clone(), a[2].clone()];
        assert!(matches!(combine(&mixed), Err(HorcruxError::IdMismatch)));
    }

    #[test]
    fn k_equals_two_is_a_line() {
        let secret = secret_bytes(42);
        let salt = [5u8; SALT_LEN];
        let shares = split(4, 2, &secret, salt).unwrap();
        let recovered = combine(&shares[1..3]).unwrap();
        assert_eq!(recovered, secret);
    }
}
