//! Split a byte stream into N encrypted horcruxes, any K of which
//! reassemble the original.
//!
//! The cryptographic core is Shamir-style secret sharing over a 256-bit
//! prime field ([`sss`]), gated by an authenticated streaming cipher
//! ([`stream`]). [`planner`] decides how encrypted blocks spread across the
//! N horcrux files so that any K of them cover the whole stream; [`split`]
//! and [`combine`] drive that process end to end through the on-disk framing
//! defined in [`framing`] and [`horcrux_io`].

pub mod cli;
pub mod combine;
pub mod config;
pub mod error;
pub mod field;
pub mod framing;
pub mod horcrux_io;
pub mod planner;
pub mod pwhash;
pub mod split;
pub mod sss;
pub mod stream;

pub use combine::{combine as Combine, CombineOutcome};
pub use error::{HorcruxError, Result};
pub use split::split as Split;
