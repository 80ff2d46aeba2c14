//! Document error types
//!
//! Shared by source extraction, PDF layout and PDF page operations.

use thiserror::Error;

/// Unified document error type
#[derive(Debug, Error)]
pub enum DocumentError {
    /// Extension not handled by any converter
    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),

    /// Source file could not be parsed
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Failed to lay out or serialize a PDF
    #[error("Render error: {0}")]
    RenderError(String),

    /// Requested page does not exist
    #[error("Page {page} out of range (1-{total})")]
    PageOutOfRange { page: u32, total: u32 },

    /// Requested page range is empty or exceeds the document
    #[error("Invalid range {start}-{end} for PDF with {total} pages")]
    InvalidRange { start: u32, end: u32, total: u32 },

    /// PDF structure error from lopdf
    #[error("PDF error: {0}")]
    PdfError(String),

    /// Image decoding error
    #[error("Image error: {0}")]
    ImageError(String),

    /// IO error (std::io::Error)
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl DocumentError {
    /// Whether the error was caused by the request rather than the document
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedFormat(_) | Self::PageOutOfRange { .. } | Self::InvalidRange { .. }
        )
    }
}

/// Result type alias for document operations
pub type Result<T> = std::result::Result<T, DocumentError>;

/// Alias for Result
pub type DocumentResult<T> = Result<T>;

impl From<lopdf::Error> for DocumentError {
    fn from(err: lopdf::Error) -> Self {
        DocumentError::PdfError(err.to_string())
    }
}

impl From<image::ImageError> for DocumentError {
    fn from(err: image::ImageError) -> Self {
        DocumentError::ImageError(err.to_string())
    }
}

impl From<zip::result::ZipError> for DocumentError {
    fn from(err: zip::result::ZipError) -> Self {
        DocumentError::ParseError(format!("invalid archive: {}", err))
    }
}

impl From<quick_xml::Error> for DocumentError {
    fn from(err: quick_xml::Error) -> Self {
        DocumentError::ParseError(format!("invalid XML: {}", err))
    }
}

impl From<quick_xml::DeError> for DocumentError {
    fn from(err: quick_xml::DeError) -> Self {
        DocumentError::ParseError(format!("invalid XML: {}", err))
    }
}

impl From<csv::Error> for DocumentError {
    fn from(err: csv::Error) -> Self {
        DocumentError::ParseError(format!("invalid CSV: {}", err))
    }
}
