//! Compound-extension resolution and format classification.

use camino::{Utf8Path, Utf8PathBuf};

/// Compound extension and base name recovered from an input path.
///
/// The extension spans two dot-separated components when the inner one is
/// exactly `tar` (`a.tar.gz` resolves to `tar.gz`), otherwise a single
/// component; it is empty when the file name carries no dot at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionInfo {
    pub extension: String,
    /// Input path with `.<extension>` stripped.
    pub base: Utf8PathBuf,
}

impl ExtensionInfo {
    /// Path of the artifact a conversion with the given shape writes.
    #[must_use]
    pub fn target(&self, shape: OutputShape) -> Utf8PathBuf {
        match shape {
            OutputShape::RawXz => Utf8PathBuf::from(format!("{}.xz", self.base)),
            OutputShape::TarXz => Utf8PathBuf::from(format!("{}.tar.xz", self.base)),
        }
    }
}

/// Recover the compound extension and base name of `path`.
///
/// Resolution is purely syntactic and never fails; unknown extensions are
/// the classifier's concern. Stripping `.<extension>` and re-appending it
/// reconstructs the original path whenever the extension is non-empty.
#[must_use]
pub fn resolve(path: &Utf8Path) -> ExtensionInfo {
    let name = path.file_name().unwrap_or("");
    let Some(dot) = name.rfind('.') else {
        return ExtensionInfo {
            extension: String::new(),
            base: path.to_owned(),
        };
    };
    let candidate = &name[dot + 1..];
    let remainder = &name[..dot];
    let extension = if remainder.ends_with(".tar") {
        format!("tar.{candidate}")
    } else {
        candidate.to_owned()
    };
    let raw = path.as_str();
    let base = Utf8PathBuf::from(&raw[..raw.len() - extension.len() - 1]);
    ExtensionInfo { extension, base }
}

/// Single-stream codecs the conversion pipeline can decompress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    Gzip,
    Bzip2,
    Lzma,
    Lzop,
    Lzip,
    Xz,
}

impl Codec {
    /// External tool that decompresses this codec.
    #[must_use]
    pub fn tool(self) -> &'static str {
        match self {
            Self::Gzip => "gzip",
            Self::Bzip2 => "bzip2",
            Self::Lzma | Self::Xz => "xz",
            Self::Lzop => "lzop",
            Self::Lzip => "lzip",
        }
    }

    /// Arguments that decompress stdin to stdout.
    #[must_use]
    pub fn decompress_args(self) -> &'static [&'static str] {
        match self {
            Self::Lzma => &["--format=lzma", "-q", "-d", "-c"],
            _ => &["-q", "-d", "-c"],
        }
    }
}

/// Container families whose extraction yields multiple member files and
/// therefore needs a staging area before re-tarring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    Zip,
    SevenZ,
    Rar,
    Ar,
}

impl Container {
    /// External tool that extracts this family.
    #[must_use]
    pub fn tool(self) -> &'static str {
        match self {
            Self::Zip => "unzip",
            Self::SevenZ => "7z",
            Self::Rar => "unrar",
            Self::Ar => "ar",
        }
    }
}

/// How an input must be unpacked before recompression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionKind {
    /// Unknown or missing extension; the file is compressed where it stands.
    None,
    /// Directory contents are tarred directly.
    Directory,
    /// A single compressed stream.
    Stream(Codec),
    /// A multi-file container.
    Container(Container),
}

/// Shape of the canonical artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputShape {
    RawXz,
    TarXz,
}

/// Extraction strategy and output shape derived from a compound extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatSpec {
    pub kind: ExtractionKind,
    pub shape: OutputShape,
}

impl FormatSpec {
    /// Spec for directory inputs, which are detected by filesystem metadata
    /// rather than by extension.
    #[must_use]
    pub fn directory() -> Self {
        Self {
            kind: ExtractionKind::Directory,
            shape: OutputShape::TarXz,
        }
    }
}

/// Map a compound extension to its extraction strategy.
///
/// Grouping is by extraction mechanism, so a new codec suffix is a one-line
/// addition. Matching is case-sensitive: `Z` is the compress suffix.
#[must_use]
pub fn classify(extension: &str) -> FormatSpec {
    use ExtractionKind::{Container as Pack, None as Direct, Stream};
    use OutputShape::{RawXz, TarXz};

    let (kind, shape) = match extension {
        "zip" | "jar" | "cbz" => (Pack(Container::Zip), TarXz),
        "7z" | "cb7" => (Pack(Container::SevenZ), TarXz),
        "rar" | "cbr" => (Pack(Container::Rar), TarXz),
        "ar" => (Pack(Container::Ar), TarXz),
        "tar.gz" | "tgz" | "tar.Z" => (Stream(Codec::Gzip), TarXz),
        "tar.bz" | "tar.bz2" | "tbz" | "tbz2" => (Stream(Codec::Bzip2), TarXz),
        "tar.lzma" => (Stream(Codec::Lzma), TarXz),
        "tar.lzo" | "tzo" => (Stream(Codec::Lzop), TarXz),
        "tar.lz" | "tlz" => (Stream(Codec::Lzip), TarXz),
        "tar.xz" | "txz" => (Stream(Codec::Xz), TarXz),
        "gz" | "Z" => (Stream(Codec::Gzip), RawXz),
        "bz" | "bz2" => (Stream(Codec::Bzip2), RawXz),
        "lzma" => (Stream(Codec::Lzma), RawXz),
        "lzo" => (Stream(Codec::Lzop), RawXz),
        "lz" => (Stream(Codec::Lzip), RawXz),
        "xz" => (Stream(Codec::Xz), RawXz),
        _ => (Direct, RawXz),
    };
    FormatSpec { kind, shape }
}
