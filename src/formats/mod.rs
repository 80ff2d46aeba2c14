//! Source format extraction
//!
//! Each format module turns raw file bytes into a [`Rendition`], which the
//! `pdf::layout` module then writes out as PDF.
//!
//! # Architecture
//!
//! - `text`, `markdown`, `html`, `csv`: plain text sources
//! - `image`: raster images, one page each
//! - `office`: OOXML packages (`docx`, `xlsx`, `pptx`) read straight from
//!   their ZIP container

pub mod csv;
pub mod html;
pub mod image;
pub mod markdown;
pub mod office;
pub mod text;

use std::path::{Path, PathBuf};

use crate::document::{DocumentError, DocumentResult, Rendition};
use crate::pdf;

/// Every extension accepted by the converter, lowercase with leading dot
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    ".txt", ".md", ".html", ".csv", ".png", ".jpg", ".jpeg", ".bmp", ".tiff", ".docx", ".xlsx",
    ".pptx",
];

/// Source file formats that can be converted to PDF
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Text,
    Markdown,
    Html,
    Csv,
    Image,
    Docx,
    Xlsx,
    Pptx,
}

impl SourceFormat {
    /// Map an extension (with or without the leading dot, any case)
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        match ext.as_str() {
            "txt" => Some(Self::Text),
            "md" => Some(Self::Markdown),
            "html" => Some(Self::Html),
            "csv" => Some(Self::Csv),
            "png" | "jpg" | "jpeg" | "bmp" | "tiff" => Some(Self::Image),
            "docx" => Some(Self::Docx),
            "xlsx" => Some(Self::Xlsx),
            "pptx" => Some(Self::Pptx),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    pub fn from_filename(name: &str) -> Option<Self> {
        Self::from_path(Path::new(name))
    }

    /// Extract the content of `data` in this format
    pub fn extract(&self, data: &[u8]) -> DocumentResult<Rendition> {
        match self {
            Self::Text => Ok(text::extract(data)),
            Self::Markdown => markdown::extract(data),
            Self::Html => html::extract(data),
            Self::Csv => csv::extract(data),
            Self::Image => image::extract(data),
            Self::Docx => office::docx::extract(data),
            Self::Xlsx => office::xlsx::extract(data),
            Self::Pptx => office::pptx::extract(data),
        }
    }
}

/// Whether a filename has a convertible extension
pub fn is_supported(name: &str) -> bool {
    SourceFormat::from_filename(name).is_some()
}

/// Lowercase extension with a leading dot, or empty
pub fn extension_of(name: &str) -> String {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default()
}

/// Convert the file at `input` to a PDF at `output`
pub fn convert_to_pdf(input: &Path, output: &Path) -> DocumentResult<PathBuf> {
    let format = SourceFormat::from_path(input).ok_or_else(|| {
        let name = input.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        DocumentError::UnsupportedFormat(extension_of(name))
    })?;

    let data = std::fs::read(input)?;
    let rendition = format.extract(&data)?;
    pdf::write_pdf(&rendition, output)?;

    tracing::debug!(
        input = %input.display(),
        output = %output.display(),
        format = ?format,
        "Converted file to PDF"
    );
    Ok(output.to_path_buf())
}
