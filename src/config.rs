//! Tunable constants shared across the planner, splitter and password hash.
//!
//! Kept in one place so a reader never has to hunt for a magic number.

/// Smallest ideal block size (in bytes) for which smart distribution is
/// worthwhile. Below this, per-block framing overhead dominates.
pub const MIN_BLOCK_SIZE: u64 = 20;

/// Block size used for round-robin distribution when smart sizing is not
/// applicable and the remaining chunk is still large enough to bother
/// chunking.
pub const DEFAULT_BLOCK_SIZE: u64 = 4096;

/// Largest chunk read into memory at once when the total stream size is
/// unknown (e.g. reading from a pipe).
pub const MAX_CHUNK_SIZE: u64 = 1024 * 1024 * 100;

/// Argon2id `opslimit` used by [`crate::pwhash::hsh`].
pub const PWHASH_OPSLIMIT: u32 = 2;

/// Argon2id `memlimit` in bytes used by [`crate::pwhash::hsh`].
pub const PWHASH_MEMLIMIT: usize = 67_108_864;

/// Output length in bytes of [`crate::pwhash::hsh`].
pub const PWHASH_OUTLEN: usize = 32;

/// File extension used for horcrux output files.
pub const HORCRUX_EXTENSION: &str = "hrcx";
