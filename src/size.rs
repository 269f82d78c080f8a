//! Block accounting for progress weighting
//!
//! A block is the unit of both hash-stream reads and progress. The estimate here
//! must match the number of reads `checksum::compute_hash` performs, otherwise
//! the progress bar never reaches (or overshoots) its total.

/// Default number of bytes per block (64 KiB)
pub const DEFAULT_BLOCK_SIZE: u64 = 65536;

/// Number of blocks a file of `byte_size` bytes occupies, rounded up.
///
/// A zero-byte file occupies zero blocks. `block_size` must be non-zero;
/// config validation rejects zero before any scan starts.
pub fn block_count(byte_size: u64, block_size: u64) -> u64 {
    debug_assert!(block_size > 0, "block size must be non-zero");
    byte_size.div_ceil(block_size)
}
