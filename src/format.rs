//! Output formats, inferred from the output path's extension

use log::warn;
use std::fmt;
use std::path::Path;

/// Encoding of a rendered page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Png,
    Jpeg,
    Webp,
    /// Printed document rather than a rasterized clip
    Pdf,
}

impl OutputFormat {
    /// Map a file extension (without the dot, any case) to a format
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(OutputFormat::Png),
            "jpg" | "jpeg" => Some(OutputFormat::Jpeg),
            "webp" => Some(OutputFormat::Webp),
            "pdf" => Some(OutputFormat::Pdf),
            _ => None,
        }
    }

    /// Infer the format for an output path, falling back to PNG when the
    /// extension is missing or unknown.
    pub fn from_path(path: &Path) -> Self {
        let ext = path.extension().and_then(|e| e.to_str());
        match ext.and_then(Self::from_extension) {
            Some(format) => format,
            None => {
                warn!(
                    "Cannot infer image format from {:?}, writing PNG",
                    path.display().to_string()
                );
                OutputFormat::Png
            }
        }
    }

    /// Whether `quality` applies to this format
    pub fn supports_quality(self) -> bool {
        matches!(self, OutputFormat::Jpeg | OutputFormat::Webp)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Webp => "webp",
            OutputFormat::Pdf => "pdf",
        };
        f.write_str(name)
    }
}
