//! binfmt dispatch - userspace fallback for binfmt_misc
//!
//! The kernel's binfmt_misc can only match a file by magic bytes or by
//! extension. Some registrations also need a userspace *detector* to
//! confirm the match. For those, the kernel is pointed at `run-detectors`,
//! which repeats the kernel's matching over every registration in the
//! administration directory, consults the detectors, and execs the
//! interpreter that wins.
//!
//! # Flow
//!
//! 1. [`Registry::load`] reads and normalizes every registration.
//! 2. [`prefix::prefix_len`] sizes one buffer big enough for every magic
//!    record, and [`prefix::read_prefix`] fills it from the target.
//! 3. [`matcher::candidates`] keeps the records that match.
//! 4. [`dispatch::dispatch`] tries detector-gated candidates, then the rest.
//!
//! ```rust,no_run
//! use binfmt_dispatch::{run, DispatchOptions, ProcessLauncher};
//! use std::ffi::OsString;
//!
//! let args: Vec<OsString> = std::env::args_os().skip(1).collect();
//! // Only returns if no interpreter could be started.
//! let err = match run(&DispatchOptions::new(), &args, &mut ProcessLauncher) {
//!     Ok(never) => match never {},
//!     Err(err) => err,
//! };
//! eprintln!("{err}");
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod admin;
pub mod dispatch;
pub mod error;
pub mod matcher;
pub mod pattern;
pub mod prefix;
pub mod registry;
pub mod types;

pub use dispatch::{Launcher, ProcessLauncher};
pub use error::{DispatchError, RegistrationError, Result};
pub use registry::Registry;
pub use types::{
    DispatchOptions, FormatKind, FormatRecord, KernelFlags, Registration, DEFAULT_ADMINDIR,
};

use std::ffi::OsString;
use std::path::Path;

/// Load the registry from the configured administration directory.
pub fn load_registry(options: &DispatchOptions) -> Result<Registry> {
    Registry::load(options)
}

/// Read the target's prefix and return the records that match it.
pub fn find_candidates<'r>(
    registry: &'r Registry,
    target: &Path,
) -> Result<Vec<&'r FormatRecord>> {
    let toread = prefix::prefix_len(registry);
    tracing::debug!("reading {} bytes of {}", toread, target.display());
    let buf = prefix::read_prefix(target, toread)?;
    Ok(matcher::candidates(registry, &buf, target))
}

/// Run the whole pipeline for `args`: the target path followed by the
/// arguments it was invoked with.
///
/// With [`ProcessLauncher`] this only returns on failure.
pub fn run<L: Launcher>(
    options: &DispatchOptions,
    args: &[OsString],
    launcher: &mut L,
) -> Result<L::Replaced> {
    let target = Path::new(args.first().ok_or(DispatchError::MissingTarget)?);
    let registry = load_registry(options)?;
    let candidates = find_candidates(&registry, target)?;
    dispatch::dispatch(&candidates, args, launcher)
}

/// Get version information for this library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;
    use std::fs;
    use std::io;
    use std::path::PathBuf;

    /// Launcher where every detector rejects and every exec succeeds.
    struct FirstExec;

    impl Launcher for FirstExec {
        type Replaced = (PathBuf, Vec<OsString>);

        fn run_detector(&mut self, _detector: &Path, _target: &OsStr) -> bool {
            false
        }

        fn replace(&mut self, interpreter: &Path, args: &[OsString]) -> io::Result<Self::Replaced> {
            Ok((interpreter.to_path_buf(), args.to_vec()))
        }
    }

    fn admindir(entries: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (name, data) in entries {
            fs::write(dir.path().join(name), data).unwrap();
        }
        dir
    }

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }

    #[test]
    fn test_run_shebang() {
        let admin = admindir(&[("sh", "shell\nmagic\n0\n\\x23\\x21\n\n/bin/sh\n")]);
        let work = tempfile::tempdir().unwrap();
        let script = work.path().join("script");
        fs::write(&script, b"#!/bin/sh\necho hi\n").unwrap();

        let args = vec![script.clone().into_os_string(), OsString::from("one")];
        let (interpreter, forwarded) = run(
            &DispatchOptions::with_admindir(admin.path()),
            &args,
            &mut FirstExec,
        )
        .unwrap();
        assert_eq!(interpreter, PathBuf::from("/bin/sh"));
        assert_eq!(forwarded, args);
    }

    #[test]
    fn test_run_no_match() {
        let admin = admindir(&[("elf", "x\nmagic\n0\n\\x7fELF\n\n/bin/elf\n")]);
        let work = tempfile::tempdir().unwrap();
        let target = work.path().join("data.txt");
        fs::write(&target, b"plain text").unwrap();

        let err = run(
            &DispatchOptions::with_admindir(admin.path()),
            &[target.into_os_string()],
            &mut FirstExec,
        )
        .unwrap_err();
        assert!(matches!(err, DispatchError::NoInterpreter { .. }));
    }

    #[test]
    fn test_run_missing_admindir() {
        let work = tempfile::tempdir().unwrap();
        let err = run(
            &DispatchOptions::with_admindir(work.path().join("absent")),
            &[OsString::from("/bin/sh")],
            &mut FirstExec,
        )
        .unwrap_err();
        assert!(matches!(err, DispatchError::AdminDir { .. }));
    }

    #[test]
    fn test_run_missing_target() {
        let admin = admindir(&[]);
        let err = run(
            &DispatchOptions::with_admindir(admin.path()),
            &[OsString::from("/nonexistent/target")],
            &mut FirstExec,
        )
        .unwrap_err();
        assert!(matches!(err, DispatchError::TargetOpen { .. }));
    }

    #[test]
    fn test_huge_offset_does_not_block_others() {
        let admin = admindir(&[
            ("huge", "big\nmagic\n1000000000000000\nAB\n\n/usr/bin/big\n"),
            ("sh", "shell\nmagic\n0\n#!\n\n/bin/sh\n"),
        ]);
        let registry = load_registry(&DispatchOptions::with_admindir(admin.path())).unwrap();

        let work = tempfile::tempdir().unwrap();
        let script = work.path().join("script");
        fs::write(&script, b"#!/bin/sh\n").unwrap();

        let found = find_candidates(&registry, &script).unwrap();
        let names: Vec<_> = found.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["sh"]);
    }

    #[test]
    fn test_find_candidates_extension_and_magic() {
        let admin = admindir(&[
            ("jar", "java\nextension\n\njar\n\n/usr/bin/jexec\n"),
            ("zip", "zip\nmagic\n0\nPK\\x03\\x04\n\n/usr/bin/unzip-run\n"),
        ]);
        let registry = load_registry(&DispatchOptions::with_admindir(admin.path())).unwrap();

        let work = tempfile::tempdir().unwrap();
        let target = work.path().join("app.jar");
        fs::write(&target, b"PK\x03\x04rest").unwrap();

        let found = find_candidates(&registry, &target).unwrap();
        let names: Vec<_> = found.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["jar", "zip"]);
    }
}
