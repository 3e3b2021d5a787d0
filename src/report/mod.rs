//! Per-input run summaries.

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use serde::Serialize;

use crate::retain::OriginalDisposition;

/// Outcome of one input, as printed and serialized.
#[derive(Debug, Serialize)]
pub struct RunEntry {
    pub input: Utf8PathBuf,
    pub output: Utf8PathBuf,
    pub succeeded: bool,
    pub already_canonical: bool,
    pub original: OriginalDisposition,
    /// Failing stage and its exit status, when any stage failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl RunEntry {
    /// One-line human-readable summary.
    #[must_use]
    pub fn describe(&self) -> String {
        let original = match self.original {
            OriginalDisposition::Deleted => "original deleted",
            OriginalDisposition::BackedUp => "original backed up",
            OriginalDisposition::Kept => "original kept",
            OriginalDisposition::Replaced => "replaced in place",
            OriginalDisposition::Consumed => "original consumed",
        };
        if self.succeeded {
            format!("{} -> {} ({original})", self.input, self.output)
        } else {
            format!(
                "{}: conversion failed ({})",
                self.input,
                self.failure.as_deref().unwrap_or("unknown stage")
            )
        }
    }
}

/// Render entries as a pretty JSON array on stdout.
pub fn write_json(entries: &[RunEntry]) -> Result<()> {
    serde_json::to_writer_pretty(std::io::stdout(), entries)
        .context("failed to render run summary")?;
    println!();
    Ok(())
}
