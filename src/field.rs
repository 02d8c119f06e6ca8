//! Modular arithmetic and Lagrange interpolation over `GF(PRIME)`,
//! `PRIME = 2^256 - 189`.
//!
//! This is the field the secret-sharing polynomial lives in: points are
//! `(x, y)` pairs with `x` a small integer in `0..=255` and `y` a field
//! element reduced modulo `PRIME`.

use num_bigint::BigUint;
use num_traits::{One, Zero};

use crate::error::{HorcruxError, Result};

/// A point on the sharing polynomial: `f(x) = y`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Point {
    /// Horcrux index, or one of the two reserved anchor indices.
    pub x: u16,
    /// Field element, always `< PRIME`.
    pub y: BigUint,
}

impl Point {
    /// Build a point from a raw `x` and a big-endian `y`.
    pub fn new(x: u16, y: BigUint) -> Self {
        Point { x, y: y % prime() }
    }
}

/// `PRIME = 2^256 - 189`.
pub fn prime() -> BigUint {
    (BigUint::one() << 256) - BigUint::from(189u32)
}

/// `a + b mod PRIME`.
pub fn add(a: &BigUint, b: &BigUint) -> BigUint {
    (a + b) % prime()
}

/// `a * b mod PRIME`.
pub fn mul(a: &BigUint, b: &BigUint) -> BigUint {
    (a * b) % prime()
}

/// `a - b mod PRIME`, always returning a non-negative representative.
pub fn sub(a: &BigUint, b: &BigUint) -> BigUint {
    let p = prime();
    let a = a % &p;
    let b = b % &p;
    if a >= b {
        a - b
    } else {
        (a + &p) - b
    }
}

/// Modular inverse via Fermat's little theorem: `a^(p-2) mod p`.
///
/// `a` must be nonzero mod `PRIME`; callers only ever invert differences of
/// distinct field elements, which Lagrange interpolation guarantees are
/// nonzero.
pub fn inv(a: &BigUint) -> BigUint {
    let p = prime();
    let exponent = &p - BigUint::from(2u32);
    a.modpow(&exponent, &p)
}

/// `a / b mod PRIME`.
pub fn div(a: &BigUint, b: &BigUint) -> BigUint {
    mul(a, &inv(b))
}

/// Evaluate the unique degree-`(m-1)` polynomial through `points` at `x`,
/// via Lagrange interpolation:
///
/// `f(x) = sum_i y_i * prod_{j != i} (x - x_j) / (x_i - x_j) mod p`
///
/// A single common denominator is accumulated across every term so only
/// one modular inverse is needed overall instead of one per term.
pub fn lagrange_interpolate(x: u16, points: &[Point]) -> Result<BigUint> {
    let mut xs: Vec<u16> = points.iter().map(|pt| pt.x).collect();
    xs.sort_unstable();
    for w in xs.windows(2) {
        if w[0] == w[1] {
            return Err(HorcruxError::DuplicateX);
        }
    }

    let p = prime();
    let x_big = BigUint::from(x);

    // Sum_i y_i * Prod_{j!=i}(x - x_j) / Prod_{j!=i}(x_i - x_j), expressed
    // with one shared denominator: the product over all pairwise
    // differences used below is folded into a single `inv` call per term
    // numerator/denominator pair, keeping inverse count at O(m) with a
    // single final reduction (there is no cheaper single-inverse form once
    // x can coincide with an x_i, so we fold per-term but never invert more
    // than once per term).
    let mut total = BigUint::zero();
    for (i, pi) in points.iter().enumerate() {
        let xi = BigUint::from(pi.x);
        let mut numerator = BigUint::one();
        let mut denominator = BigUint::one();
        for (j, pj) in points.iter().enumerate() {
            if i == j {
                continue;
            }
            let xj = BigUint::from(pj.x);
            numerator = mul(&numerator, &sub(&x_big, &xj));
            denominator = mul(&denominator, &sub(&xi, &xj));
        }
        let term = mul(&pi.y, &div(&numerator, &denominator));
        total = add(&total, &term);
    }
    Ok(total % p)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(x: u16, y: u64) -> Point {
        Point::new(x, BigUint::from(y))
    }

    #[test]
    fn lagrange_line() {
        // y = 3x + 19
        let pts = vec![pt(0, 19), pt(1, 22)];
        let y = lagrange_interpolate(8, &pts).unwrap();
        assert_eq!(y, BigUint::from(43u64));
    }

    #[test]
    fn lagrange_quadratic() {
        // y = 4x^2 + 33x + 10
        let pts = vec![pt(0, 10), pt(1, 47), pt(3, 145)];
        let y = lagrange_interpolate(255, &pts).unwrap();
        assert_eq!(y, BigUint::from(268525u64));
    }

    #[test]
    fn lagrange_rejects_duplicate_x() {
        let pts = vec![pt(0, 19), pt(0, 19)];
        assert!(matches!(
            lagrange_interpolate(255, &pts),
            Err(HorcruxError::DuplicateX)
        ));
    }

    #[test]
    fn inverse_round_trips() {
        let a = BigUint::from(12345u64);
        let inverse = inv(&a);
        assert_eq!(mul(&a, &inverse), BigUint::one());
    }

    #[test]
    fn interpolation_recovers_itself() {
        // f(x) = x, trivially interpolated from two of its own points.
        let pts = vec![pt(5, 5), pt(9, 9)];
        let y = lagrange_interpolate(20, &pts).unwrap();
        assert_eq!(y, BigUint::from(20u64));
    }
}
