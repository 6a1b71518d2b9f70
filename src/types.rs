//! Core types for the binfmt dispatcher.
//!
//! This module defines the raw registration as read from the
//! administration directory, the normalized format record the matcher
//! works on, and the run configuration.

use bitflags::bitflags;
use std::fmt;
use std::path::{Path, PathBuf};

/// Default administration directory maintained by `update-binfmts`.
pub const DEFAULT_ADMINDIR: &str = "/var/lib/binfmts";

/// How a format recognizes its files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatKind {
    /// Masked magic bytes at a fixed offset.
    Magic,
    /// Filename extension.
    Extension,
}

impl FormatKind {
    /// Parse the `type` line of a registration.
    pub fn from_type(raw: &[u8]) -> Option<Self> {
        match raw {
            b"magic" => Some(Self::Magic),
            b"extension" => Some(Self::Extension),
            _ => None,
        }
    }

    /// Name as written in registration files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Magic => "magic",
            Self::Extension => "extension",
        }
    }
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

bitflags! {
    /// binfmt_misc flags carried by a registration.
    ///
    /// These only matter to the kernel; they are kept so a loaded record
    /// describes its registration completely.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct KernelFlags: u8 {
        /// `C`: compute credentials from the target, not the interpreter.
        const CREDENTIALS = 1 << 0;
        /// `P`: preserve the original argv[0].
        const PRESERVE = 1 << 1;
        /// `F`: open the interpreter at registration time.
        const FIX_BINARY = 1 << 2;
    }
}

impl KernelFlags {
    /// Kernel flag letters, in the order `update-binfmts` writes them.
    pub fn letters(&self) -> String {
        let mut out = String::new();
        if self.contains(Self::PRESERVE) {
            out.push('P');
        }
        if self.contains(Self::CREDENTIALS) {
            out.push('C');
        }
        if self.contains(Self::FIX_BINARY) {
            out.push('F');
        }
        out
    }
}

/// One registration entry as loaded from the administration directory.
///
/// Patterns are still in their escaped text form and the offset is still
/// the raw decimal string; [`crate::registry`] normalizes both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    /// Entry name (the file name in the administration directory)
    pub name: String,
    /// Package that installed the registration
    pub package: String,
    /// Recognition method
    pub kind: FormatKind,
    /// Decimal offset, possibly empty
    pub offset: String,
    /// Escaped magic bytes, or the extension for [`FormatKind::Extension`]
    pub magic: Vec<u8>,
    /// Escaped mask bytes, possibly empty
    pub mask: Vec<u8>,
    /// Program that runs matching files
    pub interpreter: PathBuf,
    /// Optional userspace detector
    pub detector: Option<PathBuf>,
    /// Kernel flags
    pub flags: KernelFlags,
}

/// A validated format rule, ready for matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatRecord {
    /// Entry name
    pub name: String,
    /// Package that installed the registration
    pub package: String,
    /// Recognition method
    pub kind: FormatKind,
    /// Decoded magic bytes (or extension text)
    pub pattern: Vec<u8>,
    /// Decoded mask; empty means every bit counts
    pub mask: Vec<u8>,
    /// Byte offset of the magic in the target file
    pub offset: usize,
    /// Program that runs matching files
    pub interpreter: PathBuf,
    /// Optional userspace detector
    pub detector: Option<PathBuf>,
    /// Kernel flags
    pub flags: KernelFlags,
}

impl FormatRecord {
    /// Decoded length of the magic pattern.
    pub fn pattern_len(&self) -> usize {
        self.pattern.len()
    }

    /// Number of leading file bytes this record needs to see.
    ///
    /// `None` for extension records, which never look at file contents,
    /// and for offsets too large to address.
    pub fn span(&self) -> Option<usize> {
        match self.kind {
            FormatKind::Magic => self.offset.checked_add(self.pattern.len()),
            FormatKind::Extension => None,
        }
    }

    /// Detector path, if this format requires one.
    pub fn detector(&self) -> Option<&Path> {
        self.detector.as_deref()
    }
}

/// Configuration for a dispatch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOptions {
    /// Directory holding one registration file per format
    pub admindir: PathBuf,
}

impl DispatchOptions {
    /// Options with the default administration directory.
    pub fn new() -> Self {
        Self {
            admindir: PathBuf::from(DEFAULT_ADMINDIR),
        }
    }

    /// Options reading registrations from `admindir`.
    pub fn with_admindir(admindir: impl Into<PathBuf>) -> Self {
        Self {
            admindir: admindir.into(),
        }
    }
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self::new()
    }
}
