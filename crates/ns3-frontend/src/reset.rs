use std::fs;
use std::io;

use giant_core::DataDir;
use log::{info, warn};

/// What [`clear_data_dir`] found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearOutcome {
    /// The directory was empty (or had just been created).
    Empty,
    /// This many files were removed.
    Removed(usize),
}

/// Removes the files left in the data directory by previous sweeps. Subdirectories are kept.
///
/// The directory is created if it does not exist. Clearing an empty directory only logs a
/// warning.
pub fn clear_data_dir(dir: &DataDir) -> io::Result<ClearOutcome> {
    let path = dir.path();
    info!("Clearing simulation files from: {}", path.display());
    fs::create_dir_all(path)?;
    let entries = fs::read_dir(path)?.collect::<Result<Vec<_>, _>>()?;
    if entries.is_empty() {
        warn!("Directory is empty. Nothing to be removed.");
        return Ok(ClearOutcome::Empty);
    }
    warn!("Deleting files from previous simulations.");
    let mut removed = 0;
    for entry in entries {
        if entry.file_type()?.is_dir() {
            continue;
        }
        fs::remove_file(entry.path())?;
        removed += 1;
    }
    Ok(ClearOutcome::Removed(removed))
}
