//! Administration directory loader.
//!
//! `update-binfmts` keeps one file per registered format under the
//! administration directory. Each file holds one field per line:
//!
//! ```text
//! package
//! type            magic | extension
//! offset
//! magic
//! mask
//! interpreter
//! detector        (optional)
//! credentials     (optional, yes/no)
//! preserve        (optional, yes/no)
//! fix_binary      (optional, yes/no)
//! ```
//!
//! A broken entry is reported and skipped; only an unreadable directory
//! stops the scan.

use crate::error::{DispatchError, RegistrationError, Result};
use crate::types::{FormatKind, KernelFlags, Registration};
use memchr::memchr;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Newline-separated fields of a registration file.
struct Fields<'a> {
    rest: &'a [u8],
}

impl<'a> Fields<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { rest: data }
    }

    fn required(
        &mut self,
        field: &'static str,
    ) -> std::result::Result<&'a [u8], RegistrationError> {
        self.next().ok_or(RegistrationError::Truncated { field })
    }

    fn optional(&mut self) -> &'a [u8] {
        self.next().unwrap_or_default()
    }
}

impl<'a> Iterator for Fields<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        if self.rest.is_empty() {
            return None;
        }
        match memchr(b'\n', self.rest) {
            Some(end) => {
                let line = &self.rest[..end];
                self.rest = &self.rest[end + 1..];
                Some(line)
            }
            None => {
                let line = self.rest;
                self.rest = &[];
                Some(line)
            }
        }
    }
}

fn to_path(raw: &[u8]) -> PathBuf {
    PathBuf::from(OsStr::from_bytes(raw))
}

fn check_name(name: &str) -> std::result::Result<(), RegistrationError> {
    if name.is_empty() || name == "." || name == ".." || name.contains('/') {
        return Err(RegistrationError::InvalidName {
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Parse the contents of one registration file.
pub fn parse_registration(
    name: &str,
    data: &[u8],
) -> std::result::Result<Registration, RegistrationError> {
    check_name(name)?;

    let mut fields = Fields::new(data);
    let package = fields.required("package")?;
    let kind = fields.required("type")?;
    let offset = fields.required("offset")?;
    let magic = fields.required("magic")?;
    let mask = fields.required("mask")?;
    let interpreter = fields.required("interpreter")?;
    let detector = fields.optional();

    let mut flags = KernelFlags::empty();
    for flag in [
        KernelFlags::CREDENTIALS,
        KernelFlags::PRESERVE,
        KernelFlags::FIX_BINARY,
    ] {
        if fields.optional() == b"yes" {
            flags |= flag;
        }
    }

    let kind = FormatKind::from_type(kind).ok_or_else(|| RegistrationError::UnknownType {
        kind: String::from_utf8_lossy(kind).into_owned(),
    })?;

    Ok(Registration {
        name: name.to_string(),
        package: String::from_utf8_lossy(package).into_owned(),
        kind,
        offset: String::from_utf8_lossy(offset).into_owned(),
        magic: magic.to_vec(),
        mask: mask.to_vec(),
        interpreter: to_path(interpreter),
        detector: (!detector.is_empty()).then(|| to_path(detector)),
        flags,
    })
}

/// Read and parse the registration file at `path`.
pub fn load_registration(
    name: &OsStr,
    path: &Path,
) -> std::result::Result<Registration, RegistrationError> {
    let name = name.to_str().ok_or_else(|| RegistrationError::InvalidName {
        name: name.to_string_lossy().into_owned(),
    })?;
    let data = fs::read(path)?;
    parse_registration(name, &data)
}

/// Load every registration in `admindir`, in file-name order.
pub fn scan(admindir: &Path) -> Result<Vec<Registration>> {
    let dir_error = |source| DispatchError::AdminDir {
        path: admindir.to_path_buf(),
        source,
    };

    let mut names: Vec<OsString> = Vec::new();
    for entry in fs::read_dir(admindir).map_err(dir_error)? {
        names.push(entry.map_err(dir_error)?.file_name());
    }
    names.sort();

    let mut registrations = Vec::with_capacity(names.len());
    for name in names {
        let path = admindir.join(&name);
        match load_registration(&name, &path) {
            Ok(registration) => registrations.push(registration),
            Err(err) => warn!("{}: {}", path.display(), err),
        }
    }

    debug!(
        "loaded {} registrations from {}",
        registrations.len(),
        admindir.display()
    );
    Ok(registrations)
}
