//! Block-streamed SHA-256 computation

use crate::progress::Progress;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Hash `path`, advancing `progress` by one unit per block read.
///
/// With `known` set (resuming from a recovery file) the file is not opened:
/// progress jumps by `size_blocks` and `known` is returned unchanged. I/O errors
/// are returned to the caller, which decides whether they are fatal.
pub fn compute_hash(
    path: &Path,
    size_blocks: u64,
    block_size: u64,
    progress: &mut Progress,
    known: Option<&str>,
) -> io::Result<String> {
    if let Some(hash) = known {
        progress.advance(size_blocks);
        return Ok(hash.to_string());
    }

    let mut file = File::open(path)?;
    hash_reader(&mut file, block_size, progress)
}

/// Hash everything `reader` yields in `block_size` chunks.
///
/// Each chunk is filled completely before hashing (only the final one may be
/// short), so the number of progress units equals `ceil(len / block_size)`
/// regardless of how the underlying reader splits its reads.
pub fn hash_reader<R: Read>(
    reader: &mut R,
    block_size: u64,
    progress: &mut Progress,
) -> io::Result<String> {
    let block_len = usize::try_from(block_size)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "block size too large"))?;
    if block_len == 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "block size must be non-zero",
        ));
    }

    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; block_len];

    loop {
        let filled = fill_block(reader, &mut buffer)?;
        if filled == 0 {
            break;
        }
        hasher.update(&buffer[..filled]);
        progress.advance(1);
        if filled < block_len {
            break;
        }
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Hex SHA-256 of an in-memory buffer
pub fn hash_bytes(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

/// Read until `buffer` is full or the reader is exhausted
fn fill_block<R: Read>(reader: &mut R, buffer: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        match reader.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
