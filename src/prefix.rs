//! Target file prefix sizing and reading.
//!
//! All magic records are checked against one shared buffer holding the
//! first [`prefix_len`] bytes of the target. The buffer stops at end of
//! file; the matcher reads anything past it as zero.

use crate::error::{DispatchError, Result};
use crate::registry::Registry;
use crate::types::FormatRecord;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Number of leading bytes needed to evaluate every magic record.
pub fn prefix_len(registry: &Registry) -> usize {
    registry
        .iter()
        .filter_map(FormatRecord::span)
        .max()
        .unwrap_or(0)
}

/// Read at most `len` leading bytes of `path`.
///
/// Failing to open the file is an error. A short read, or a read error
/// after opening, just yields fewer bytes. Only what the file holds is
/// allocated, whatever `len` asks for.
pub fn read_prefix(path: &Path, len: usize) -> Result<Vec<u8>> {
    let file = File::open(path).map_err(|source| DispatchError::TargetOpen {
        path: path.to_path_buf(),
        source,
    })?;

    let mut buf = Vec::new();
    if let Err(err) = file.take(len as u64).read_to_end(&mut buf) {
        debug!("short read of {}: {}", path.display(), err);
    }
    Ok(buf)
}
