//! Writing generated files and preparing output directories.

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use cgen_diagnostics::{Diagnostic, codes};
use serde::Serialize;

/// What [`write_lines`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteOutcome {
    /// The file was written.
    Written,
    /// The file existed and overwriting was disabled.
    SkippedExisting,
}

/// Write `lines` to `path`, each followed by `\n`.
///
/// Parent directories are created. An existing file is left alone unless
/// `overwrite` is set.
pub fn write_lines(path: &Path, lines: &[String], overwrite: bool) -> io::Result<WriteOutcome> {
    if !overwrite && path.exists() {
        return Ok(WriteOutcome::SkippedExisting);
    }
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let mut out = BufWriter::new(fs::File::create(path)?);
    for line in lines {
        out.write_all(line.as_bytes())?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(WriteOutcome::Written)
}

/// Create `root` and each of `subdirectories` below it.
///
/// Directories that already exist are reported as info; failures as errors.
/// Nothing is deleted.
pub fn prepare_directories(root: &Path, subdirectories: &[String]) -> Vec<Diagnostic> {
    let mut diags = Vec::new();
    let targets =
        std::iter::once(root.to_path_buf()).chain(subdirectories.iter().map(|d| root.join(d)));
    for dir in targets {
        if dir.is_dir() {
            diags.push(Diagnostic::info(
                codes::DIRECTORY_EXISTS,
                format!("directory {} already exists", dir.display()),
                None,
            ));
            continue;
        }
        if let Err(e) = fs::create_dir_all(&dir) {
            diags.push(Diagnostic::error(
                codes::WRITE_FAILED,
                format!("cannot create directory {}: {e}", dir.display()),
                None,
            ));
        }
    }
    diags
}
