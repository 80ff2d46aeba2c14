//! Document types
//!
//! Format-agnostic content model. Extractors produce a [`Rendition`], the PDF
//! layout engine consumes it.

use serde::Serialize;

// ============================================================================
// Page Geometry
// ============================================================================

/// Paper sizes used by the converters, in PDF points (72 per inch)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageSize {
    /// 8.5 × 11 in
    #[default]
    Letter,
    /// 210 × 297 mm
    A4,
}

impl PageSize {
    /// Width and height in points
    pub fn dimensions(&self) -> (f32, f32) {
        match self {
            PageSize::Letter => (612.0, 792.0),
            PageSize::A4 => (595.28, 841.89),
        }
    }
}

// ============================================================================
// Flow Content
// ============================================================================

/// One unit of flowing content
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    /// Section heading, level 1 (largest) to 6
    Heading { level: u8, text: String },
    /// Wrapped proportional text
    Paragraph(String),
    /// A single monospace line, whitespace preserved
    Preformatted(String),
    /// Vertical gap in points
    Spacer(f32),
    Table(Table),
}

impl Block {
    pub fn heading(level: u8, text: impl Into<String>) -> Self {
        Block::Heading {
            level: level.clamp(1, 6),
            text: text.into(),
        }
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        Block::Paragraph(text.into())
    }
}

/// Grid of cell strings; the first row is styled as a header
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Widest row
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }
}

/// Flowing document laid out onto pages of one size
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FlowDocument {
    pub page_size: PageSize,
    pub blocks: Vec<Block>,
}

impl FlowDocument {
    pub fn new(page_size: PageSize) -> Self {
        Self {
            page_size,
            blocks: Vec::new(),
        }
    }

    pub fn push(&mut self, block: Block) {
        self.blocks.push(block);
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

// ============================================================================
// Raster Content
// ============================================================================

/// Decoded 8-bit RGB image
#[derive(Debug, Clone, PartialEq)]
pub struct Picture {
    pub width: u32,
    pub height: u32,
    /// Row-major RGB triplets
    pub rgb: Vec<u8>,
}

/// What a source file turns into before PDF layout
#[derive(Debug, Clone, PartialEq)]
pub enum Rendition {
    Flow(FlowDocument),
    /// Single page showing one image
    Picture(Picture),
}

// ============================================================================
// PDF Inspection
// ============================================================================

/// Page count and basic metadata of an existing PDF
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PdfInfo {
    pub page_count: u32,
    pub metadata: PdfMetadata,
}

/// Document information dictionary entries
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PdfMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
}
