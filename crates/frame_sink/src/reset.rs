//! Output directory reset
//!
//! Runs before the simulator connection is opened so frames from different
//! runs never mix.

use std::fs;
use std::io;
use std::path::Path;

use tracing::{debug, info};

/// Delete everything under `path`, leaving `path` present and empty
///
/// A missing `path` is created. Returns the number of top-level entries
/// removed.
///
/// # Errors
/// Any failure to list or delete an entry, or `path` existing as a file.
pub fn reset_output_dir(path: &Path) -> io::Result<usize> {
    if !path.exists() {
        fs::create_dir_all(path)?;
        info!(path = %path.display(), "created output directory");
        return Ok(0);
    }

    if !path.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("'{}' exists and is not a directory", path.display()),
        ));
    }

    let mut removed = 0;
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        let entry_path = entry.path();
        // file_type() does not follow symlinks, so a linked directory is
        // unlinked rather than emptied.
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(&entry_path)?;
        } else {
            fs::remove_file(&entry_path)?;
        }
        debug!(path = %entry_path.display(), "removed");
        removed += 1;
    }

    info!(path = %path.display(), removed, "output directory cleared");
    Ok(removed)
}
