//! Crate-wide error taxonomy.

use thiserror::Error;

/// Every way a split or combine operation can fail.
#[derive(Debug, Error)]
pub enum HorcruxError {
    /// Framing, varint, or field schema violation in a horcrux file.
    #[error("malformed horcrux record: {0}")]
    Malformed(String),

    /// Shares supplied to combine carry different salts/ids, i.e. come from
    /// different splits.
    #[error("shares come from different splits (id mismatch)")]
    IdMismatch,

    /// Fewer than `threshold` distinct points were supplied to combine.
    #[error("not enough shares: need {needed}, have {have}")]
    NotEnoughShares {
        /// The threshold recorded on the supplied shares.
        needed: u8,
        /// How many distinct points were actually supplied.
        have: usize,
    },

    /// Recovered secret's digest does not match the embedded digest point.
    #[error("invalid digest: shares are corrupt, forged, or incomplete")]
    InvalidDigest,

    /// Lagrange interpolation was given points with a repeated x-coordinate.
    #[error("duplicate x-coordinate in interpolation points")]
    DuplicateX,

    /// The splitter ran out of plaintext before the combination iterator was
    /// exhausted; an internal invariant was violated.
    #[error("distribution incomplete, stream would not reconstruct")]
    DistributionIncomplete,

    /// AEAD tag check failed for a specific block.
    #[error("decryption failed on horcrux {horcrux_id}")]
    DecryptionError {
        /// 0-based index of the offending horcrux.
        horcrux_id: usize,
    },

    /// Combine could not find a live horcrux carrying the next block id.
    #[error("missing block {id}: no live horcrux carries it")]
    MissingBlock {
        /// The block id that could not be located.
        id: u64,
    },

    /// Attempted to encrypt a zero-byte plaintext chunk.
    #[error("cannot encrypt an empty message")]
    EmptyMessage,

    /// Caller-supplied construction parameters (N, K, ...) violate an
    /// invariant.
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// Underlying stream failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, HorcruxError>;
