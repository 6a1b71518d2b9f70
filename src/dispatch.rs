//! Interpreter dispatch.
//!
//! Matching formats are tried in two passes. Formats with a detector go
//! first, and only once their detector accepts the target; formats without
//! one follow. The first interpreter that starts replaces this process.
//! An interpreter that fails to start is reported and the next candidate
//! is tried.

use crate::error::{DispatchError, Result};
use crate::types::FormatRecord;
use std::convert::Infallible;
use std::ffi::{OsStr, OsString};
use std::io::{self, Write};
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, warn};

/// Runs detectors and replaces the current process.
pub trait Launcher {
    /// What a successful replacement yields.
    ///
    /// [`ProcessLauncher`] uses [`Infallible`]: a successful exec never
    /// comes back.
    type Replaced;

    /// Run `detector` on `target` and report whether it accepted it.
    fn run_detector(&mut self, detector: &Path, target: &OsStr) -> bool;

    /// Start `interpreter` with `args` in place of the current process.
    ///
    /// `args` excludes argv[0], which is set to `interpreter`.
    fn replace(&mut self, interpreter: &Path, args: &[OsString]) -> io::Result<Self::Replaced>;
}

/// [`Launcher`] backed by real child processes and `execvp`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessLauncher;

impl Launcher for ProcessLauncher {
    type Replaced = Infallible;

    fn run_detector(&mut self, detector: &Path, target: &OsStr) -> bool {
        match Command::new(detector).arg(target).status() {
            Ok(status) => {
                debug!("detector {} exited with {}", detector.display(), status);
                status.success()
            }
            Err(err) => {
                warn!("unable to run {}: {}", detector.display(), err);
                false
            }
        }
    }

    fn replace(&mut self, interpreter: &Path, args: &[OsString]) -> io::Result<Infallible> {
        Err(Command::new(interpreter).arg0(interpreter).args(args).exec())
    }
}

/// Hand the target to the first candidate interpreter that starts.
///
/// `args` is the target path followed by its own arguments. Returns
/// [`DispatchError::NoInterpreter`] once every candidate has failed.
pub fn dispatch<L: Launcher>(
    candidates: &[&FormatRecord],
    args: &[OsString],
    launcher: &mut L,
) -> Result<L::Replaced> {
    let target = args.first().ok_or(DispatchError::MissingTarget)?;

    for record in candidates {
        let Some(detector) = record.detector() else {
            continue;
        };
        if !launcher.run_detector(detector, target) {
            debug!("{}: detector rejected {:?}", record.name, target);
            continue;
        }
        if let Some(replaced) = attempt(record, args, launcher) {
            return Ok(replaced);
        }
    }

    for record in candidates.iter().filter(|record| record.detector.is_none()) {
        if let Some(replaced) = attempt(record, args, launcher) {
            return Ok(replaced);
        }
    }

    Err(DispatchError::NoInterpreter {
        target: PathBuf::from(target),
    })
}

fn attempt<L: Launcher>(
    record: &FormatRecord,
    args: &[OsString],
    launcher: &mut L,
) -> Option<L::Replaced> {
    debug!("{}: trying {}", record.name, record.interpreter.display());
    // exec discards anything still sitting in our buffers
    if let Err(err) = io::stdout().flush().and_then(|()| io::stderr().flush()) {
        debug!("flushing output before exec: {}", err);
    }

    match launcher.replace(&record.interpreter, args) {
        Ok(replaced) => Some(replaced),
        Err(err) => {
            warn!("unable to exec {}: {}", record.interpreter.display(), err);
            None
        }
    }
}
