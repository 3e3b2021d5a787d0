//! rexz library entry points.

pub mod cli;
pub mod convert;
pub mod error;
pub mod format;
pub mod pipeline;
pub mod report;
pub mod retain;

use std::collections::BTreeSet;

use anyhow::{anyhow, Result};
use camino::{Utf8Path, Utf8PathBuf};
use indicatif::{ProgressBar, ProgressStyle};

use crate::cli::Cli;
use crate::error::PreconditionError;
use crate::format::{ExtractionKind, FormatSpec};
use crate::pipeline::XzSettings;
use crate::report::RunEntry;
use crate::retain::OriginalDisposition;

/// Execute the run described by the parsed CLI input.
///
/// Inputs are processed strictly in order, each to completion, so a
/// retention move can never race a still-running pipeline on the same
/// path. A failed conversion is reported and the batch continues; the run
/// still exits non-zero at the end.
pub fn run(cli: Cli) -> Result<()> {
    let settings = XzSettings::from_env();
    pipeline::ensure_tools(required_tools(&cli.paths))?;
    let backup_requested = !cli.no_backup;

    let progress = if cli.verbose && !cli.quiet && cli.paths.len() > 1 {
        let pb = ProgressBar::new(cli.paths.len() as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style);
        Some(pb)
    } else {
        None
    };

    let mut entries = Vec::new();
    let mut failures = 0usize;
    for raw in &cli.paths {
        if let Some(pb) = &progress {
            pb.inc(1);
            pb.set_message(raw.to_string());
        }
        let path = resolve_input(raw)?;
        match process_input(&path, backup_requested, &settings) {
            Ok(entry) => {
                if !entry.succeeded {
                    failures += 1;
                    eprintln!("rexz: {}", entry.describe());
                } else if cli.verbose && !cli.quiet && progress.is_none() {
                    println!("{}", entry.describe());
                }
                entries.push(entry);
            }
            Err(err) => {
                failures += 1;
                eprintln!("rexz: {raw}: {err:#}");
            }
        }
    }
    if let Some(pb) = progress {
        pb.finish_with_message("done");
    }

    if cli.json && !cli.quiet {
        report::write_json(&entries)?;
    }

    if failures > 0 {
        return Err(anyhow!(
            "{failures} of {} inputs were not converted",
            cli.paths.len()
        ));
    }
    Ok(())
}

/// Convert one resolved input and settle its original.
fn process_input(
    path: &Utf8Path,
    backup_requested: bool,
    settings: &XzSettings,
) -> Result<RunEntry> {
    let info = format::resolve(path);
    let spec = if path.is_dir() {
        FormatSpec::directory()
    } else {
        format::classify(&info.extension)
    };

    let outcome = convert::convert(path, &info, &spec, settings)?;

    let original = if outcome.input_consumed {
        if outcome.all_stages_ok {
            OriginalDisposition::Consumed
        } else {
            OriginalDisposition::Kept
        }
    } else if spec.kind == ExtractionKind::Directory {
        // Directories are only ever read; the sibling artifact is the sole
        // filesystem change.
        OriginalDisposition::Kept
    } else {
        let decision = retain::decide(
            backup_requested,
            outcome.all_stages_ok,
            outcome.already_canonical,
        );
        let applied =
            retain::apply(decision, path, &outcome.output, Utf8Path::new(retain::BACKUP_DIR))?;
        if outcome.all_stages_ok && outcome.output.as_path() == path {
            // A same-path recompression overwrote the input via the staged
            // rename, whatever the decision says about the "original".
            OriginalDisposition::Replaced
        } else {
            applied
        }
    };

    let failure = outcome
        .report
        .first_failure()
        .map(|stage| format!("{}: {}", stage.tool, stage.status));
    Ok(RunEntry {
        input: path.to_owned(),
        output: outcome.output,
        succeeded: outcome.all_stages_ok,
        already_canonical: outcome.already_canonical,
        original,
        failure,
    })
}

/// External tools this batch needs, derived from each input's
/// classification; checked before any input is touched.
fn required_tools(paths: &[Utf8PathBuf]) -> BTreeSet<&'static str> {
    let mut tools = BTreeSet::new();
    tools.insert("xz");
    for path in paths {
        if path.is_dir() {
            tools.insert("tar");
            continue;
        }
        let info = format::resolve(path);
        match format::classify(&info.extension).kind {
            ExtractionKind::Container(family) => {
                tools.insert("tar");
                tools.insert(family.tool());
            }
            ExtractionKind::Stream(codec) => {
                tools.insert(codec.tool());
            }
            ExtractionKind::Directory | ExtractionKind::None => {}
        }
    }
    tools
}

/// Resolve an input argument to an absolute, symlink-free path.
fn resolve_input(raw: &Utf8Path) -> Result<Utf8PathBuf> {
    match raw.canonicalize_utf8() {
        Ok(path) => Ok(path),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            Err(PreconditionError::MissingInput(raw.to_owned()).into())
        }
        Err(err) => Err(anyhow!(err).context(format!("failed to canonicalize {raw}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_tools_follow_the_inputs() {
        let paths = vec![
            Utf8PathBuf::from("a.tar.gz"),
            Utf8PathBuf::from("b.zip"),
            Utf8PathBuf::from("README"),
        ];
        let tools = required_tools(&paths);
        assert!(tools.contains("xz"));
        assert!(tools.contains("gzip"));
        assert!(tools.contains("unzip"));
        assert!(tools.contains("tar"));
        assert!(!tools.contains("unrar"));
        assert!(!tools.contains("bzip2"));
    }

    #[test]
    fn xz_is_always_required() {
        let tools = required_tools(&[Utf8PathBuf::from("README")]);
        assert_eq!(tools.iter().copied().collect::<Vec<_>>(), vec!["xz"]);
    }

    #[test]
    fn missing_inputs_are_precondition_errors() {
        let err = resolve_input(Utf8Path::new("/definitely/not/here.tar.gz"))
            .expect_err("path must not exist");
        assert!(err.downcast_ref::<PreconditionError>().is_some());
    }
}
