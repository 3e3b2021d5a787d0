//! Shared error types for consistent exit codes.

use camino::Utf8PathBuf;
use thiserror::Error;

/// Batch-level precondition failures.
///
/// Nothing has been written or moved when one of these surfaces: missing
/// tools are detected before the first input is touched, and a missing
/// input aborts the run at that argument.
#[derive(Debug, Error)]
pub enum PreconditionError {
    #[error("required tool not found on PATH: {0}")]
    MissingTool(String),
    #[error("input path does not exist: {0}")]
    MissingInput(Utf8PathBuf),
}
