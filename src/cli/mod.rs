//! Command-line interface definitions for rexz.

use camino::Utf8PathBuf;
use clap::{Parser, ValueHint};

const CLI_EXAMPLES: &str = "Examples:\n  rexz photos.zip\n  rexz --no-backup logs.tar.gz notes.txt.bz2\n  rexz ./build-output/\n";

/// Top-level CLI parser.
#[derive(Debug, Parser)]
#[command(
    name = "rexz",
    version,
    about = "Normalize archives and compressed files into xz canonical form",
    long_about = "Repackages any recognized archive or compressed file as .xz or .tar.xz at maximum compression, keeping originals under an OldArchives backup directory by default.",
    after_help = CLI_EXAMPLES,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Discard originals after a successful conversion instead of
    /// collecting them under OldArchives.
    #[arg(short = 'n', long = "no-backup")]
    pub no_backup: bool,
    /// Emit verbose progress.
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
    /// Reduce output to errors only.
    #[arg(long = "quiet")]
    pub quiet: bool,
    /// Emit a machine-readable JSON summary on stdout.
    #[arg(long = "json")]
    pub json: bool,
    /// Archives, compressed files, or directories to convert.
    #[arg(value_name = "PATH", required = true, value_hint = ValueHint::AnyPath)]
    pub paths: Vec<Utf8PathBuf>,
}
