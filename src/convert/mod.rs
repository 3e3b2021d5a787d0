//! Conversion of resolved inputs into canonical xz artifacts.

use std::fs::File;

use anyhow::{anyhow, Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use tempfile::Builder as TempBuilder;

use crate::format::{Codec, Container, ExtensionInfo, ExtractionKind, FormatSpec, OutputShape};
use crate::pipeline::{self, PipelineReport, Stage, XzSettings};

/// Result of converting one input.
#[derive(Debug)]
pub struct ConversionOutcome {
    /// Canonical artifact the conversion produced (or attempted).
    pub output: Utf8PathBuf,
    /// True only when every pipeline stage reported success.
    pub all_stages_ok: bool,
    /// The input was already xz-compressed and was recompressed onto its
    /// canonical name.
    pub already_canonical: bool,
    /// The original was consumed by an in-place compression; retention does
    /// not apply to this variant.
    pub input_consumed: bool,
    /// Per-stage exit statuses.
    pub report: PipelineReport,
}

impl ConversionOutcome {
    fn new(output: Utf8PathBuf, report: PipelineReport) -> Self {
        Self {
            output,
            all_stages_ok: report.all_ok(),
            already_canonical: false,
            input_consumed: false,
            report,
        }
    }
}

/// Convert `path` according to `spec`, writing the canonical artifact next
/// to it.
///
/// The original input is only ever modified by the in-place compression
/// leaf; every other variant leaves it for the retention policy.
pub fn convert(
    path: &Utf8Path,
    info: &ExtensionInfo,
    spec: &FormatSpec,
    settings: &XzSettings,
) -> Result<ConversionOutcome> {
    match spec.kind {
        ExtractionKind::Directory => tar_directory(path, info, settings),
        ExtractionKind::Container(family) => repack_container(path, info, family, settings),
        ExtractionKind::Stream(Codec::Xz) => recompress_canonical(path, info, spec.shape, settings),
        ExtractionKind::Stream(codec) => recompress_stream(path, info, codec, spec.shape, settings),
        ExtractionKind::None => compress_in_place(path, settings),
    }
}

/// Tar a directory's immediate contents into `<base>.tar.xz`.
///
/// The directory itself is never part of the archive and is never deleted.
fn tar_directory(
    path: &Utf8Path,
    info: &ExtensionInfo,
    settings: &XzSettings,
) -> Result<ConversionOutcome> {
    let target = info.target(OutputShape::TarXz);
    let report = tar_into(path, &target, settings)?;
    if !report.all_ok() {
        discard_partial(&target);
    }
    Ok(ConversionOutcome::new(target, report))
}

/// Extract a container into a scratch directory, then re-tar its contents.
///
/// The scratch directory is scoped to this call and removed on every exit
/// path, success or failure.
fn repack_container(
    path: &Utf8Path,
    info: &ExtensionInfo,
    family: Container,
    settings: &XzSettings,
) -> Result<ConversionOutcome> {
    let target = info.target(OutputShape::TarXz);
    let parent = path.parent().unwrap_or(Utf8Path::new("."));
    let scratch = TempBuilder::new()
        .prefix(".rexz-")
        .tempdir_in(parent.as_std_path())
        .with_context(|| format!("failed to create scratch directory beside {path}"))?;
    let scratch_path = Utf8PathBuf::from_path_buf(scratch.path().to_path_buf())
        .map_err(|_| anyhow!("scratch path not UTF-8: {}", scratch.path().display()))?;

    let extract = extractor_stage(family, path, &scratch_path);
    let workdir = matches!(family, Container::Ar).then_some(scratch_path.as_path());
    let unpack = pipeline::run_single(&extract, None, None, workdir)
        .with_context(|| format!("failed to run {}", extract.tool()))?;

    let mut report = PipelineReport::default();
    let unpacked = unpack.ok();
    report.push(unpack);
    if unpacked {
        report.merge(tar_into(&scratch_path, &target, settings)?);
        if !report.all_ok() {
            discard_partial(&target);
        }
    }
    Ok(ConversionOutcome::new(target, report))
}

/// Decompress a non-xz stream and recompress it in one pipe.
fn recompress_stream(
    path: &Utf8Path,
    info: &ExtensionInfo,
    codec: Codec,
    shape: OutputShape,
    settings: &XzSettings,
) -> Result<ConversionOutcome> {
    let target = info.target(shape);
    let input =
        File::open(path.as_std_path()).with_context(|| format!("failed to open {path}"))?;
    let out = File::create(target.as_std_path())
        .with_context(|| format!("failed to create {target}"))?;
    let decompress = Stage::new(codec.tool()).args(codec.decompress_args().iter().copied());
    let report = pipeline::run_pipe(&decompress, Some(input), &settings.compress_stage(), out)
        .with_context(|| format!("pipeline failed for {path}"))?;
    if !report.all_ok() {
        discard_partial(&target);
    }
    Ok(ConversionOutcome::new(target, report))
}

/// Recompress an input that is already in the xz family.
///
/// The result is staged under a temporary name and renamed over the final
/// target only once the whole pipe succeeded, so the input is never read
/// and written through the same path concurrently. Maximum settings are
/// re-applied even though the input is already xz.
fn recompress_canonical(
    path: &Utf8Path,
    info: &ExtensionInfo,
    shape: OutputShape,
    settings: &XzSettings,
) -> Result<ConversionOutcome> {
    let target = info.target(shape);
    let parent = target.parent().unwrap_or(Utf8Path::new("."));
    let staged = TempBuilder::new()
        .prefix(".rexz-")
        .suffix(".xz")
        .tempfile_in(parent.as_std_path())
        .with_context(|| format!("failed to stage recompression output beside {target}"))?;
    let out = staged
        .as_file()
        .try_clone()
        .context("failed to hand the staged output to the pipeline")?;
    let input =
        File::open(path.as_std_path()).with_context(|| format!("failed to open {path}"))?;

    let decompress = Stage::new("xz").args(["-q", "-d", "-c"]);
    let report = pipeline::run_pipe(&decompress, Some(input), &settings.compress_stage(), out)
        .with_context(|| format!("pipeline failed for {path}"))?;
    if report.all_ok() {
        staged
            .persist(target.as_std_path())
            .with_context(|| format!("failed to move recompressed output over {target}"))?;
    }

    let mut outcome = ConversionOutcome::new(target, report);
    outcome.already_canonical = true;
    Ok(outcome)
}

/// Compress a file with no recognized extension in place to `<path>.xz`.
///
/// xz itself consumes the original on success; this is the one variant that
/// bypasses the retention policy.
fn compress_in_place(path: &Utf8Path, settings: &XzSettings) -> Result<ConversionOutcome> {
    let target = Utf8PathBuf::from(format!("{path}.xz"));
    let stage = Stage::new("xz")
        .args(settings.compress_args())
        .arg(path.as_str());
    let stage_report = pipeline::run_single(&stage, None, None, None)
        .with_context(|| format!("failed to run xz on {path}"))?;
    let mut report = PipelineReport::default();
    report.push(stage_report);

    let mut outcome = ConversionOutcome::new(target, report);
    outcome.input_consumed = true;
    Ok(outcome)
}

/// Tar `dir`'s immediate entries piped into xz, writing `target`.
fn tar_into(dir: &Utf8Path, target: &Utf8Path, settings: &XzSettings) -> Result<PipelineReport> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir.as_std_path())? {
        let entry = entry?;
        let name = entry
            .file_name()
            .into_string()
            .map_err(|name| anyhow!("entry name not UTF-8: {name:?}"))?;
        entries.push(name);
    }
    entries.sort();

    let mut tar = Stage::new("tar").args(["-cf", "-", "-C", dir.as_str()]);
    if entries.is_empty() {
        tar = tar.args(["-T", "/dev/null"]);
    } else {
        tar = tar.arg("--").args(entries);
    }

    let out = File::create(target.as_std_path())
        .with_context(|| format!("failed to create {target}"))?;
    pipeline::run_pipe(&tar, None, &settings.compress_stage(), out)
        .with_context(|| format!("pipeline failed for {dir}"))
}

fn extractor_stage(family: Container, archive: &Utf8Path, scratch: &Utf8Path) -> Stage {
    match family {
        Container::Zip => Stage::new("unzip").args(["-qq", archive.as_str(), "-d", scratch.as_str()]),
        Container::SevenZ => Stage::new("7z")
            .args(["x", "-y", "-bd"])
            .arg(format!("-o{scratch}"))
            .arg(archive.as_str()),
        Container::Rar => Stage::new("unrar")
            .args(["x", "-idq", "-y", archive.as_str()])
            .arg(format!("{scratch}/")),
        // ar has no destination flag; it runs with the scratch directory as
        // its working directory.
        Container::Ar => Stage::new("ar").args(["x", archive.as_str()]),
    }
}

/// Remove a partially-written artifact after a failed pipeline.
fn discard_partial(target: &Utf8Path) {
    let _ = fs::remove_file(target.as_std_path());
}
