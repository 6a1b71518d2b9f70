//! Format matching.
//!
//! This redoes the check the kernel's binfmt_misc performs before it
//! hands a file to an interpreter: masked magic comparison at a fixed
//! offset, or an exact filename extension comparison.

use crate::registry::Registry;
use crate::types::{FormatKind, FormatRecord};
use memchr::memrchr;
use std::iter;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use tracing::debug;

/// Bytes after the last `.` of `path`, if it has one.
///
/// The whole path is searched, as binfmt_misc does, so a dot in a
/// directory component counts.
pub fn extension_of(path: &Path) -> Option<&[u8]> {
    let bytes = path.as_os_str().as_bytes();
    memrchr(b'.', bytes).map(|dot| &bytes[dot + 1..])
}

/// Check a single record against the target's prefix and extension.
///
/// `prefix` may be shorter than the record's span; missing bytes are zero.
pub fn matches(record: &FormatRecord, prefix: &[u8], extension: Option<&[u8]>) -> bool {
    match record.kind {
        FormatKind::Magic => {
            // bytes past the end of the prefix read as zero
            let segment = prefix
                .get(record.offset..)
                .unwrap_or_default()
                .iter()
                .copied()
                .chain(iter::repeat(0))
                .take(record.pattern_len());
            if record.mask.is_empty() {
                segment.eq(record.pattern.iter().copied())
            } else {
                segment
                    .zip(&record.mask)
                    .map(|(byte, mask)| byte & mask)
                    .eq(record.pattern.iter().copied())
            }
        }
        FormatKind::Extension => extension == Some(record.pattern.as_slice()),
    }
}

/// Records matching `target`, in registry order.
///
/// `prefix` holds up to [`crate::prefix::prefix_len`] leading bytes of the
/// target.
pub fn candidates<'r>(
    registry: &'r Registry,
    prefix: &[u8],
    target: &Path,
) -> Vec<&'r FormatRecord> {
    let extension = extension_of(target);
    let found: Vec<_> = registry
        .iter()
        .filter(|record| matches(record, prefix, extension))
        .collect();

    debug!(
        "{} of {} formats match {}",
        found.len(),
        registry.len(),
        target.display()
    );
    found
}
