//! run-detectors CLI
//!
//! Registered with binfmt_misc as the interpreter for formats that need a
//! userspace detector. Picks the real interpreter for the target file and
//! execs it with the original arguments.

use binfmt_dispatch::{run, DispatchOptions, ProcessLauncher, DEFAULT_ADMINDIR};
use clap::Parser;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Run userspace binary format detectors.
///
/// Matches the target against every format registered in the
/// administration directory and runs the first interpreter that accepts it.
#[derive(Parser, Debug)]
#[command(name = "run-detectors")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Administration directory
    #[arg(long, value_name = "DIRECTORY", default_value = DEFAULT_ADMINDIR)]
    admindir: PathBuf,

    /// Log matching decisions to stderr
    #[arg(short, long)]
    verbose: bool,

    /// Target file, followed by the arguments to pass on to its interpreter
    #[arg(
        value_name = "TARGET",
        required = true,
        num_args = 1..,
        trailing_var_arg = true
    )]
    command: Vec<OsString>,
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "binfmt_dispatch=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    let options = DispatchOptions::with_admindir(args.admindir);
    match run(&options, &args.command, &mut ProcessLauncher) {
        Ok(never) => match never {},
        Err(err) => {
            eprintln!("run-detectors: {err}");
            ExitCode::from(2)
        }
    }
}
