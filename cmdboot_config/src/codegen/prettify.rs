use std::{
    io::{self, Error, ErrorKind},
    path::Path,
    process::{Command, Stdio},
};

/// Formats a generated file in place. Fails if `rustfmt` is missing or
/// rejects the file, leaving it untouched.
pub fn prettify_file<P: AsRef<Path>>(path: P) -> io::Result<()> {
    let status = Command::new("rustfmt")
        .args(["--edition", "2021"])
        .arg(path.as_ref())
        .stderr(Stdio::null())
        .status()?;
    if status.success() {
        Ok(())
    } else {
        Err(Error::new(ErrorKind::Other, format!("rustfmt exited with {}", status)))
    }
}
