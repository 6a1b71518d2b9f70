//! Format registry.
//!
//! The registry is built once per run from the administration directory
//! and is read-only afterwards. Its order is the dispatch order.
//!
//! Records whose mask does not fit their magic are dropped without a
//! warning: the directory is shared by every package that registers a
//! format, so such entries usually belong to someone else's setup. The
//! same goes for magic records reaching past [`MAX_SPAN`], which the kernel
//! would refuse to register.

use crate::admin;
use crate::error::Result;
use crate::pattern;
use crate::types::{DispatchOptions, FormatKind, FormatRecord, Registration};
use tracing::debug;

/// Largest `offset + magic length` a magic record may need.
///
/// This is the kernel's `BINPRM_BUF_SIZE`, the most of a file binfmt_misc
/// ever looks at.
pub const MAX_SPAN: usize = 256;

/// Ordered collection of validated format records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registry {
    records: Vec<FormatRecord>,
}

impl Registry {
    /// Load the registry from the configured administration directory.
    pub fn load(options: &DispatchOptions) -> Result<Self> {
        let registrations = admin::scan(&options.admindir)?;
        Ok(Self::from_registrations(registrations))
    }

    /// Normalize raw registrations, dropping the ones that cannot match.
    pub fn from_registrations<I>(registrations: I) -> Self
    where
        I: IntoIterator<Item = Registration>,
    {
        let records = registrations.into_iter().filter_map(normalize).collect();
        Self { records }
    }

    /// Records in registration order.
    pub fn records(&self) -> &[FormatRecord] {
        &self.records
    }

    /// Iterate over the records in registration order.
    pub fn iter(&self) -> std::slice::Iter<'_, FormatRecord> {
        self.records.iter()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the registry holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<'a> IntoIterator for &'a Registry {
    type Item = &'a FormatRecord;
    type IntoIter = std::slice::Iter<'a, FormatRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

impl FromIterator<FormatRecord> for Registry {
    /// Collect already-decoded records, dropping the ones that cannot match.
    fn from_iter<I: IntoIterator<Item = FormatRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().filter(usable).collect(),
        }
    }
}

/// Whether a decoded record fits the matcher's limits.
fn usable(record: &FormatRecord) -> bool {
    if !record.mask.is_empty() && record.mask.len() != record.pattern_len() {
        debug!(
            "skipping {}: mask length {} does not match magic length {}",
            record.name,
            record.mask.len(),
            record.pattern_len()
        );
        return false;
    }
    if record.kind == FormatKind::Magic && record.span().map_or(true, |span| span > MAX_SPAN) {
        debug!(
            "skipping {}: magic at offset {} reaches past {} bytes",
            record.name, record.offset, MAX_SPAN
        );
        return false;
    }
    true
}

/// Decode patterns and resolve the offset of one registration.
fn normalize(reg: Registration) -> Option<FormatRecord> {
    let offset = if reg.offset.is_empty() {
        0
    } else {
        match reg.offset.parse::<usize>() {
            Ok(offset) => offset,
            Err(_) => {
                debug!("skipping {}: bad offset {:?}", reg.name, reg.offset);
                return None;
            }
        }
    };

    let record = FormatRecord {
        name: reg.name,
        package: reg.package,
        kind: reg.kind,
        pattern: pattern::decode(&reg.magic),
        mask: pattern::decode(&reg.mask),
        offset,
        interpreter: reg.interpreter,
        detector: reg.detector,
        flags: reg.flags,
    };
    if !usable(&record) {
        return None;
    }

    debug!(
        "registered {} ({}, package {:?}, flags {:?})",
        record.name,
        record.kind,
        record.package,
        record.flags.letters()
    );
    Some(record)
}
