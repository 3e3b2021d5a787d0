//! Retention policy for original inputs after conversion.

use anyhow::{Context, Result};
use camino::Utf8Path;
use fs_err as fs;
use serde::Serialize;

/// Directory collecting originals when backups are requested.
///
/// Created lazily relative to the invocation's working directory, shared by
/// every input of the run, never nested per-input.
pub const BACKUP_DIR: &str = "OldArchives";

/// What to do with the original input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionDecision {
    DeleteOriginal,
    MoveToBackup,
    LeaveInPlace,
}

/// Fate of the original, as reported to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OriginalDisposition {
    Deleted,
    BackedUp,
    Kept,
    /// The recompressed artifact was renamed over the original.
    Replaced,
    /// The compressor consumed the original itself (in-place compression).
    Consumed,
}

/// Decide the original's fate from the conversion flags.
///
/// Already-canonical inputs are never backed up: their recompressed form
/// replaces them outright, so a backup copy would just duplicate the
/// output. A failed conversion keeps the original reachable either way,
/// in place or under the backup directory.
#[must_use]
pub fn decide(
    backup_requested: bool,
    all_stages_ok: bool,
    already_canonical: bool,
) -> RetentionDecision {
    if already_canonical {
        if !backup_requested && all_stages_ok {
            RetentionDecision::DeleteOriginal
        } else {
            RetentionDecision::LeaveInPlace
        }
    } else if !backup_requested && all_stages_ok {
        RetentionDecision::DeleteOriginal
    } else if backup_requested {
        RetentionDecision::MoveToBackup
    } else {
        RetentionDecision::LeaveInPlace
    }
}

/// Apply `decision` to `input`, whose conversion produced `output`.
///
/// `backup_dir` is created on first use; creation is idempotent across the
/// inputs of one run.
pub fn apply(
    decision: RetentionDecision,
    input: &Utf8Path,
    output: &Utf8Path,
    backup_dir: &Utf8Path,
) -> Result<OriginalDisposition> {
    match decision {
        RetentionDecision::DeleteOriginal => {
            if input == output {
                // The rename in the convert step already replaced the
                // original; there is nothing left to remove.
                return Ok(OriginalDisposition::Replaced);
            }
            fs::remove_file(input.as_std_path())?;
            Ok(OriginalDisposition::Deleted)
        }
        RetentionDecision::MoveToBackup => {
            if input == output {
                return Ok(OriginalDisposition::Replaced);
            }
            fs::create_dir_all(backup_dir.as_std_path())?;
            let file_name = input
                .file_name()
                .with_context(|| format!("input path has no file name: {input}"))?;
            let destination = backup_dir.join(file_name);
            fs::rename(input.as_std_path(), destination.as_std_path())?;
            Ok(OriginalDisposition::BackedUp)
        }
        RetentionDecision::LeaveInPlace => Ok(OriginalDisposition::Kept),
    }
}
