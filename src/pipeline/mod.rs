//! External tool plumbing: PATH preflight, staged pipelines, exit capture.

use std::fs::File;
use std::io;
use std::process::{Command, ExitStatus, Stdio};

use camino::Utf8Path;

use crate::error::PreconditionError;

/// Environment variable overriding the xz compression level (0-9).
pub const LEVEL_ENV: &str = "REXZ_LEVEL";

/// Verify every required external tool is reachable on PATH.
///
/// Runs before any input is touched; a single missing tool fails the whole
/// batch.
pub fn ensure_tools<'a, I>(tools: I) -> Result<(), PreconditionError>
where
    I: IntoIterator<Item = &'a str>,
{
    for tool in tools {
        which::which(tool).map_err(|_| PreconditionError::MissingTool(tool.to_owned()))?;
    }
    Ok(())
}

/// xz invocation settings; maximum compression unless overridden.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XzSettings {
    level: u32,
    extreme: bool,
}

impl Default for XzSettings {
    fn default() -> Self {
        Self {
            level: 9,
            extreme: true,
        }
    }
}

impl XzSettings {
    /// Read the level override from the environment, falling back to the
    /// maximum preset for anything absent or unparseable.
    #[must_use]
    pub fn from_env() -> Self {
        match std::env::var(LEVEL_ENV).ok().and_then(|v| v.parse::<u32>().ok()) {
            Some(level) if level <= 9 => Self {
                level,
                extreme: false,
            },
            _ => Self::default(),
        }
    }

    /// Arguments selecting the compression preset.
    #[must_use]
    pub fn compress_args(&self) -> Vec<String> {
        let mut args = vec!["-q".to_owned(), format!("-{}", self.level)];
        if self.extreme {
            args.push("-e".to_owned());
        }
        args
    }

    /// Stage compressing stdin to stdout.
    #[must_use]
    pub fn compress_stage(&self) -> Stage {
        Stage::new("xz").args(self.compress_args()).arg("-c")
    }
}

/// A single external command in a conversion pipeline.
#[derive(Debug, Clone)]
pub struct Stage {
    tool: &'static str,
    args: Vec<String>,
}

impl Stage {
    #[must_use]
    pub fn new(tool: &'static str) -> Self {
        Self {
            tool,
            args: Vec::new(),
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Tool name, as reported in stage failures.
    #[must_use]
    pub fn tool(&self) -> &'static str {
        self.tool
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(self.tool);
        cmd.args(&self.args);
        cmd
    }
}

/// Exit status of one pipeline stage.
#[derive(Debug)]
pub struct StageReport {
    pub tool: &'static str,
    pub status: ExitStatus,
}

impl StageReport {
    #[must_use]
    pub fn ok(&self) -> bool {
        self.status.success()
    }
}

/// Aggregate result of a conversion pipeline.
///
/// Every stage's individual exit status is recorded; the conversion counts
/// as successful only when all of them succeeded.
#[derive(Debug, Default)]
pub struct PipelineReport {
    stages: Vec<StageReport>,
}

impl PipelineReport {
    pub fn push(&mut self, stage: StageReport) {
        self.stages.push(stage);
    }

    pub fn merge(&mut self, other: PipelineReport) {
        self.stages.extend(other.stages);
    }

    #[must_use]
    pub fn all_ok(&self) -> bool {
        !self.stages.is_empty() && self.stages.iter().all(StageReport::ok)
    }

    /// First failing stage, if any.
    #[must_use]
    pub fn first_failure(&self) -> Option<&StageReport> {
        self.stages.iter().find(|stage| !stage.ok())
    }
}

/// Run one stage to completion.
///
/// `stdin`/`stdout` default to null when absent so an extractor can never
/// hang waiting for terminal input.
pub fn run_single(
    stage: &Stage,
    stdin: Option<File>,
    stdout: Option<File>,
    current_dir: Option<&Utf8Path>,
) -> io::Result<StageReport> {
    let mut cmd = stage.command();
    match stdin {
        Some(file) => cmd.stdin(Stdio::from(file)),
        None => cmd.stdin(Stdio::null()),
    };
    if let Some(file) = stdout {
        cmd.stdout(Stdio::from(file));
    }
    if let Some(dir) = current_dir {
        cmd.current_dir(dir.as_std_path());
    }
    let status = cmd.status()?;
    Ok(StageReport {
        tool: stage.tool,
        status,
    })
}

/// Run `first | second > out`, waiting on both stages and recording each
/// exit status individually.
pub fn run_pipe(
    first: &Stage,
    first_stdin: Option<File>,
    second: &Stage,
    out: File,
) -> io::Result<PipelineReport> {
    let mut head = first.command();
    match first_stdin {
        Some(file) => head.stdin(Stdio::from(file)),
        None => head.stdin(Stdio::null()),
    };
    let mut head = head.stdout(Stdio::piped()).spawn()?;
    let head_out = head
        .stdout
        .take()
        .ok_or_else(|| io::Error::other("pipeline head stdout not captured"))?;

    let tail = second
        .command()
        .stdin(Stdio::from(head_out))
        .stdout(Stdio::from(out))
        .spawn();
    let mut tail = match tail {
        Ok(child) => child,
        Err(err) => {
            let _ = head.kill();
            let _ = head.wait();
            return Err(err);
        }
    };

    let head_status = head.wait()?;
    let tail_status = tail.wait()?;

    let mut report = PipelineReport::default();
    report.push(StageReport {
        tool: first.tool,
        status: head_status,
    });
    report.push(StageReport {
        tool: second.tool,
        status: tail_status,
    });
    Ok(report)
}
