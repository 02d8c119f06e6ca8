//! Chooses how encrypted blocks get spread across the N horcruxes, and
//! provides the enumeration primitives the two combinatorial strategies need.
//!
//! Three strategies, in order of preference: **smart** (one block per
//! `(N-K+1)`-combination of horcruxes, minimal total size, used whenever the
//! ideal block size is sane), **round-robin** (cyclic groups of size
//! `N-K+1`, used when sizing is impractical), and **full replicate** (every
//! horcrux gets every block, used for tiny tails).

use itertools::Itertools;

use crate::config::{DEFAULT_BLOCK_SIZE, MAX_CHUNK_SIZE, MIN_BLOCK_SIZE};

/// `C(n, r)`, saturating to `None` once it would overflow `u128`. A `None`
/// here means "far larger than any real stream size", which is all that
/// [`ideal_block_size`] needs to know.
fn binomial(n: u64, r: u64) -> Option<u128> {
    if r > n {
        return Some(0);
    }
    let r = r.min(n - r);
    let mut result: u128 = 1;
    for i in 0..r {
        result = result.checked_mul((n - i) as u128)?;
        result /= (i + 1) as u128;
    }
    Some(result)
}

fn ceil_div(a: u128, b: u128) -> u128 {
    (a + b - 1) / b
}

/// `ceil(size / C(n, n-k+1))`, the per-block quota when every combination of
/// `n-k+1` horcruxes carries exactly one unique block.
pub fn ideal_block_size(size: u64, n: u8, k: u8) -> u64 {
    let r = (n - k + 1) as u64;
    match binomial(n as u64, r) {
        Some(c) if c > 0 => ceil_div(size as u128, c).min(u64::MAX as u128) as u64,
        _ => 1,
    }
}

/// Which strategy the splitter should use for a chunk of known size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistributionMode {
    Smart { block_size: u64 },
    RoundRobin { block_size: u64 },
    FullReplicate,
}

/// Top-level decision: if the whole stream's size is known up front and its
/// ideal block size is sane, smart-distribute the entire stream in one pass
/// instead of reading it in `MAX_CHUNK_SIZE` pieces. Returns the block size
/// to use when this applies.
pub fn whole_stream_smart_block_size(known_size: u64, n: u8, k: u8) -> Option<u64> {
    let ibs = ideal_block_size(known_size, n, k);
    (MIN_BLOCK_SIZE..=MAX_CHUNK_SIZE).contains(&ibs).then_some(ibs)
}

/// Per-chunk decision, used when the stream size isn't known up front (or
/// its whole-stream ideal block size was out of range): the splitter reads
/// up to `MAX_CHUNK_SIZE` bytes at a time and picks a mode for each chunk
/// independently based on its actual size.
pub fn chunk_mode(chunk_size: u64, n: u8, k: u8) -> DistributionMode {
    let chunk_ibs = ideal_block_size(chunk_size, n, k);
    if chunk_ibs >= MIN_BLOCK_SIZE {
        DistributionMode::Smart { block_size: chunk_ibs }
    } else if chunk_size < DEFAULT_BLOCK_SIZE {
        DistributionMode::FullReplicate
    } else {
        DistributionMode::RoundRobin {
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

/// Lazily enumerate all `C(n, r)` combinations of horcrux indices `0..n`
/// taken `r` at a time, in lexicographic order. Fresh for every chunk.
pub fn combinations_of_horcruxes(n: u8, r: u8) -> impl Iterator<Item = Vec<u16>> {
    (0..n as u16).combinations(r as usize)
}

/// Cyclic group generator for round-robin distribution: repeatedly hands out
/// the next `r` indices from an infinite cycle over `0..n`, continuing from
/// where the previous call left off (so chunk boundaries don't restart the
/// cycle).
pub struct RoundRobinCycler {
    n: u16,
    r: u16,
    position: u64,
}

impl RoundRobinCycler {
    pub fn new(n: u8, r: u8) -> Self {
        RoundRobinCycler {
            n: n as u16,
            r: r as u16,
            position: 0,
        }
    }

    pub fn next_group(&mut self) -> Vec<u16> {
        let group: Vec<u16> = (0..self.r as u64)
            .map(|i| (((self.position + i) % self.n as u64)) as u16)
            .collect();
        self.position += self.r as u64;
        group
    }
}
