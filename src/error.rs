//! Error types for the binfmt dispatcher.
//!
//! Two families live here. [`DispatchError`] covers the conditions that end
//! the run. [`RegistrationError`] covers a single unusable entry in the
//! administration directory; the scan reports it and moves on.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors for a dispatch run.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The administration directory could not be opened or listed.
    #[error("unable to open {}: {source}", path.display())]
    AdminDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The target file could not be opened.
    #[error("unable to open {}: {source}", path.display())]
    TargetOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The argument vector did not name a target file.
    #[error("argument required")]
    MissingTarget,

    /// Every candidate interpreter failed, or none matched.
    #[error("unable to find an interpreter for {}", target.display())]
    NoInterpreter { target: PathBuf },
}

/// Result type alias for dispatch operations.
pub type Result<T> = std::result::Result<T, DispatchError>;

/// Problems with one registration entry.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// IO error while reading the entry.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The entry ends before all required fields were read.
    #[error("corrupt: out of binfmt data reading {field}")]
    Truncated { field: &'static str },

    /// The type line is neither `magic` nor `extension`.
    #[error("unknown type {kind:?}")]
    UnknownType { kind: String },

    /// The entry name cannot be a binary format name.
    #[error("invalid format name {name:?}")]
    InvalidName { name: String },
}
