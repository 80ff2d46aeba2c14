//! PDF layout
//!
//! Turns a [`Rendition`] into a PDF document. The layout is deliberately
//! simple: base-14 fonts, greedy word wrapping from average glyph widths,
//! fixed-height table rows. Output is legible, not typeset.

use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};

use crate::document::{Block, DocumentResult, FlowDocument, PageSize, Picture, Rendition, Table};

/// Page margin for flowing content (1 inch)
const MARGIN: f32 = 72.0;

/// Page margin around a picture (0.5 inch)
const PICTURE_MARGIN: f32 = 36.0;

/// Vertical gap before a heading that does not start a page
const HEADING_SPACE_BEFORE: f32 = 6.0;

const HEADING_SPACE_AFTER: f32 = 4.0;

const CELL_PADDING: f32 = 3.0;

/// Widest column weight, in characters, when sharing table width
const MAX_COLUMN_WEIGHT: usize = 40;

const HEADER_FILL: [f32; 3] = [0.2, 0.255, 0.333];
const STRIPE_FILL: [f32; 3] = [0.945, 0.961, 0.976];
const GRID_GREY: f32 = 0.5;

// ============================================================================
// Fonts and Styles
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Font {
    Regular,
    Bold,
    Mono,
}

impl Font {
    const ALL: [Font; 3] = [Font::Regular, Font::Bold, Font::Mono];

    fn resource_name(self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
            Font::Mono => "F3",
        }
    }

    fn base_font(self) -> &'static str {
        match self {
            Font::Regular => "Helvetica",
            Font::Bold => "Helvetica-Bold",
            Font::Mono => "Courier",
        }
    }

    /// Average advance per character, in em
    fn char_width(self) -> f32 {
        match self {
            Font::Regular => 0.5,
            Font::Bold => 0.56,
            Font::Mono => 0.6,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct TextStyle {
    font: Font,
    size: f32,
    leading: f32,
}

impl TextStyle {
    const BODY: TextStyle = TextStyle {
        font: Font::Regular,
        size: 10.0,
        leading: 14.0,
    };

    const MONO: TextStyle = TextStyle {
        font: Font::Mono,
        size: 10.0,
        leading: 14.0,
    };

    const CELL: TextStyle = TextStyle {
        font: Font::Regular,
        size: 8.0,
        leading: 12.0,
    };

    fn heading(level: u8) -> TextStyle {
        let size = match level {
            1 => 18.0,
            2 => 16.0,
            3 => 14.0,
            4 => 12.0,
            5 => 11.0,
            _ => 10.0,
        };
        TextStyle {
            font: Font::Bold,
            size,
            leading: size * 1.25,
        }
    }

    /// Characters that fit on a line of the given width
    fn chars_per_line(&self, width: f32) -> usize {
        ((width / (self.size * self.font.char_width())).floor() as usize).max(1)
    }
}

// ============================================================================
// Text Helpers
// ============================================================================

/// Encode text for a WinAnsiEncoding base-14 font; unmappable characters become `?`
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .filter_map(|c| {
            let code = c as u32;
            let byte = match c {
                '\t' => b' ',
                _ if code < 0x20 => return None,
                _ if code < 0x7F => code as u8,
                _ if (0xA0..=0xFF).contains(&code) => code as u8,
                '€' => 0x80,
                '‚' => 0x82,
                'ƒ' => 0x83,
                '„' => 0x84,
                '…' => 0x85,
                '†' => 0x86,
                '‡' => 0x87,
                'ˆ' => 0x88,
                '‰' => 0x89,
                'Š' => 0x8A,
                '‹' => 0x8B,
                'Œ' => 0x8C,
                'Ž' => 0x8E,
                '‘' => 0x91,
                '’' => 0x92,
                '“' => 0x93,
                '”' => 0x94,
                '•' => 0x95,
                '–' => 0x96,
                '—' => 0x97,
                '˜' => 0x98,
                '™' => 0x99,
                'š' => 0x9A,
                '›' => 0x9B,
                'œ' => 0x9C,
                'ž' => 0x9E,
                'Ÿ' => 0x9F,
                _ => b'?',
            };
            Some(byte)
        })
        .collect()
}

/// Byte offset of the `n`th character, or the string length
fn char_boundary(text: &str, n: usize) -> usize {
    text.char_indices().nth(n).map(|(i, _)| i).unwrap_or(text.len())
}

/// Greedy word wrap; words longer than a line are split
pub fn wrap_words(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let mut word = word;
        while word.chars().count() > max_chars {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let split = char_boundary(word, max_chars);
            lines.push(word[..split].to_string());
            word = &word[split..];
        }

        let word_len = word.chars().count();
        if current_len > 0 && current_len + 1 + word_len > max_chars {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(word);
        current_len += word_len;
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

/// Split a line into fixed-width chunks, keeping all whitespace
fn hard_wrap(line: &str, max_chars: usize) -> Vec<String> {
    let expanded = line.replace('\t', "    ");
    let chars: Vec<char> = expanded.chars().collect();
    if chars.is_empty() {
        return vec![String::new()];
    }
    chars
        .chunks(max_chars.max(1))
        .map(|chunk| chunk.iter().collect())
        .collect()
}

/// Cut text to `max_chars`, marking the cut with `...`
fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    if max_chars <= 3 {
        return text.chars().take(max_chars).collect();
    }
    let kept: String = text.chars().take(max_chars - 3).collect();
    format!("{}...", kept)
}

fn rgb(color: [f32; 3]) -> Vec<Object> {
    color.iter().map(|&c| c.into()).collect()
}

// ============================================================================
// Flow Layout
// ============================================================================

/// Cursor-based page filler producing one operation list per page
struct FlowLayout {
    width: f32,
    height: f32,
    pages: Vec<Vec<Operation>>,
    ops: Vec<Operation>,
    cursor_y: f32,
}

impl FlowLayout {
    fn new(page_size: PageSize) -> Self {
        let (width, height) = page_size.dimensions();
        Self {
            width,
            height,
            pages: Vec::new(),
            ops: Vec::new(),
            cursor_y: height - MARGIN,
        }
    }

    fn top(&self) -> f32 {
        self.height - MARGIN
    }

    fn content_width(&self) -> f32 {
        self.width - 2.0 * MARGIN
    }

    fn at_page_top(&self) -> bool {
        self.cursor_y >= self.top()
    }

    fn new_page(&mut self) {
        self.pages.push(std::mem::take(&mut self.ops));
        self.cursor_y = self.top();
    }

    /// Break the page unless `needed` points still fit
    fn ensure_space(&mut self, needed: f32) {
        if self.cursor_y - needed < MARGIN && !self.at_page_top() {
            self.new_page();
        }
    }

    fn advance(&mut self, points: f32) {
        self.cursor_y -= points;
        if self.cursor_y < MARGIN {
            self.new_page();
        }
    }

    fn show_text(&mut self, x: f32, baseline: f32, text: &str, style: TextStyle) {
        self.ops.push(Operation::new("BT", vec![]));
        self.ops.push(Operation::new(
            "Tf",
            vec![style.font.resource_name().into(), style.size.into()],
        ));
        self.ops.push(Operation::new("Td", vec![x.into(), baseline.into()]));
        self.ops.push(Operation::new(
            "Tj",
            vec![Object::String(encode_win_ansi(text), StringFormat::Literal)],
        ));
        self.ops.push(Operation::new("ET", vec![]));
    }

    fn line(&mut self, text: &str, style: TextStyle) {
        self.ensure_space(style.leading);
        if !text.is_empty() {
            let baseline = self.cursor_y - style.size;
            self.show_text(MARGIN, baseline, text, style);
        }
        self.cursor_y -= style.leading;
    }

    fn block(&mut self, block: &Block) {
        match block {
            Block::Heading { level, text } => {
                if !self.at_page_top() {
                    self.advance(HEADING_SPACE_BEFORE);
                }
                let style = TextStyle::heading(*level);
                for line in wrap_words(text, style.chars_per_line(self.content_width())) {
                    self.line(&line, style);
                }
                self.advance(HEADING_SPACE_AFTER);
            }
            Block::Paragraph(text) => {
                let style = TextStyle::BODY;
                for line in wrap_words(text, style.chars_per_line(self.content_width())) {
                    self.line(&line, style);
                }
            }
            Block::Preformatted(text) => {
                let style = TextStyle::MONO;
                for line in hard_wrap(text, style.chars_per_line(self.content_width())) {
                    self.line(&line, style);
                }
            }
            Block::Spacer(points) => self.advance(*points),
            Block::Table(table) => self.table(table),
        }
    }

    fn table(&mut self, table: &Table) {
        let columns = table.column_count();
        if columns == 0 {
            return;
        }

        let style = TextStyle::CELL;
        let row_height = style.leading + CELL_PADDING;
        let total_width = self.content_width();

        let weights: Vec<usize> = (0..columns)
            .map(|col| {
                table
                    .rows
                    .iter()
                    .filter_map(|row| row.get(col))
                    .map(|cell| cell.chars().count())
                    .max()
                    .unwrap_or(0)
                    .clamp(3, MAX_COLUMN_WEIGHT)
            })
            .collect();
        let weight_sum: usize = weights.iter().sum();
        let widths: Vec<f32> = weights
            .iter()
            .map(|&w| total_width * w as f32 / weight_sum as f32)
            .collect();

        for (index, row) in table.rows.iter().enumerate() {
            self.ensure_space(row_height);
            let bottom = self.cursor_y - row_height;

            let fill = match index {
                0 => Some(HEADER_FILL),
                i if i % 2 == 0 => Some(STRIPE_FILL),
                _ => None,
            };
            if let Some(color) = fill {
                self.ops.push(Operation::new("q", vec![]));
                self.ops.push(Operation::new("rg", rgb(color)));
                self.ops.push(Operation::new(
                    "re",
                    vec![MARGIN.into(), bottom.into(), total_width.into(), row_height.into()],
                ));
                self.ops.push(Operation::new("f", vec![]));
                self.ops.push(Operation::new("Q", vec![]));
            }

            self.ops.push(Operation::new("q", vec![]));
            self.ops.push(Operation::new("w", vec![0.5f32.into()]));
            self.ops.push(Operation::new("RG", rgb([GRID_GREY; 3])));
            let text_color = if index == 0 { [1.0; 3] } else { [0.0; 3] };
            self.ops.push(Operation::new("rg", rgb(text_color)));

            let mut x = MARGIN;
            for (col, width) in widths.iter().enumerate() {
                self.ops.push(Operation::new(
                    "re",
                    vec![x.into(), bottom.into(), (*width).into(), row_height.into()],
                ));
                self.ops.push(Operation::new("S", vec![]));

                if let Some(cell) = row.get(col) {
                    let max_chars = style.chars_per_line(width - 2.0 * CELL_PADDING);
                    let text = truncate(cell.trim(), max_chars);
                    if !text.is_empty() {
                        let baseline = bottom + CELL_PADDING + 1.5;
                        self.show_text(x + CELL_PADDING, baseline, &text, style);
                    }
                }
                x += width;
            }
            self.ops.push(Operation::new("Q", vec![]));

            self.cursor_y = bottom;
        }
    }

    fn finish(mut self) -> Vec<Vec<Operation>> {
        if !self.ops.is_empty() || self.pages.is_empty() {
            self.pages.push(self.ops);
        }
        self.pages
    }
}

// ============================================================================
// Document Assembly
// ============================================================================

/// Builds the page tree of a new PDF
struct DocumentBuilder {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<Object>,
    page_size: PageSize,
}

impl DocumentBuilder {
    fn new(page_size: PageSize) -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            kids: Vec::new(),
            page_size,
        }
    }

    fn font_resources(&mut self) -> ObjectId {
        let mut fonts = lopdf::Dictionary::new();
        for font in Font::ALL {
            let font_id = self.doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => font.base_font(),
                "Encoding" => "WinAnsiEncoding",
            });
            fonts.set(font.resource_name(), font_id);
        }
        self.doc.add_object(dictionary! { "Font" => fonts })
    }

    fn add_page(&mut self, operations: Vec<Operation>, resources: ObjectId) -> DocumentResult<()> {
        let content = Content { operations };
        let content_id = self
            .doc
            .add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "Contents" => content_id,
            "Resources" => resources,
        });
        self.kids.push(page_id.into());
        Ok(())
    }

    fn finish(mut self) -> Document {
        let (width, height) = self.page_size.dimensions();
        let count = self.kids.len() as i64;
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => self.kids,
            "Count" => count,
            "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
        };
        self.doc
            .objects
            .insert(self.pages_id, Object::Dictionary(pages));

        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);
        self.doc.compress();
        self.doc
    }
}

fn render_flow(flow: &FlowDocument) -> DocumentResult<Document> {
    let mut layout = FlowLayout::new(flow.page_size);
    for block in &flow.blocks {
        layout.block(block);
    }

    let mut builder = DocumentBuilder::new(flow.page_size);
    let resources = builder.font_resources();
    for operations in layout.finish() {
        builder.add_page(operations, resources)?;
    }
    Ok(builder.finish())
}

fn render_picture(picture: &Picture) -> DocumentResult<Document> {
    let page_size = PageSize::Letter;
    let (page_width, page_height) = page_size.dimensions();
    let mut builder = DocumentBuilder::new(page_size);

    let image = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => picture.width,
            "Height" => picture.height,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        },
        picture.rgb.clone(),
    );
    let image_id = builder.doc.add_object(image);
    let resources = builder.doc.add_object(dictionary! {
        "XObject" => dictionary! { "Im1" => image_id },
    });

    // Scale down to fit inside the margins, never up
    let available_width = page_width - 2.0 * PICTURE_MARGIN;
    let available_height = page_height - 2.0 * PICTURE_MARGIN;
    let scale = (available_width / picture.width.max(1) as f32)
        .min(available_height / picture.height.max(1) as f32)
        .min(1.0);
    let draw_width = picture.width as f32 * scale;
    let draw_height = picture.height as f32 * scale;
    let x = (page_width - draw_width) / 2.0;
    let y = (page_height - draw_height) / 2.0;

    let operations = vec![
        Operation::new("q", vec![]),
        Operation::new(
            "cm",
            vec![
                draw_width.into(),
                0.into(),
                0.into(),
                draw_height.into(),
                x.into(),
                y.into(),
            ],
        ),
        Operation::new("Do", vec!["Im1".into()]),
        Operation::new("Q", vec![]),
    ];
    builder.add_page(operations, resources)?;

    Ok(builder.finish())
}

/// Lay out a rendition as a new PDF document
pub fn render(rendition: &Rendition) -> DocumentResult<Document> {
    match rendition {
        Rendition::Flow(flow) => render_flow(flow),
        Rendition::Picture(picture) => render_picture(picture),
    }
}

/// Render and serialize to memory
pub fn render_to_bytes(rendition: &Rendition) -> DocumentResult<Vec<u8>> {
    let mut doc = render(rendition)?;
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)?;
    Ok(buffer)
}

/// Render and write to `path`
pub fn write_pdf(rendition: &Rendition, path: &Path) -> DocumentResult<()> {
    let mut doc = render(rendition)?;
    doc.save(path)?;
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
