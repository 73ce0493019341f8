//! Output destinations for findings.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Where findings are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sink {
    Stdout,
    File(PathBuf),
}

impl Sink {
    /// Uses the file at `path` if one is given and non-empty, else stdout.
    pub fn from_path(path: Option<&Path>) -> Self {
        match path {
            Some(p) if !p.as_os_str().is_empty() => Sink::File(p.to_path_buf()),
            _ => Sink::Stdout,
        }
    }

    /// Writes all of `data`, replacing any existing file.
    pub fn write(&self, data: &[u8]) -> io::Result<()> {
        match self {
            Sink::Stdout => {
                let mut stdout = io::stdout().lock();
                stdout.write_all(data)?;
                stdout.flush()
            }
            Sink::File(path) => fs::write(path, data),
        }
    }
}
