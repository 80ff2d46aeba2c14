//! Word documents: paragraphs and headings from `word/document.xml`

use quick_xml::events::Event;
use quick_xml::Reader;

use super::{attribute, Package};
use crate::document::{Block, DocumentResult, FlowDocument, PageSize, Rendition};

const DOCUMENT_PART: &str = "word/document.xml";

/// Gap standing in for an empty paragraph
const BLANK_PARAGRAPH_GAP: f32 = 6.0;

/// A paragraph as read from the document body
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DocxParagraph {
    pub style: Option<String>,
    pub text: String,
}

impl DocxParagraph {
    /// Heading level for `HeadingN` styles; a style without a digit is level 1
    pub fn heading_level(&self) -> Option<u8> {
        let style = self.style.as_deref()?;
        let lower = style.to_ascii_lowercase();
        let rest = lower.strip_prefix("heading")?;
        let level = rest
            .trim()
            .chars()
            .last()
            .and_then(|c| c.to_digit(10))
            .unwrap_or(1);
        Some(level.clamp(1, 6) as u8)
    }
}

/// Parse the paragraphs of a `document.xml` body, in document order
pub fn parse_paragraphs(xml: &str) -> DocumentResult<Vec<DocxParagraph>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(false);

    let mut paragraphs = Vec::new();
    // Text boxes nest paragraphs inside paragraphs
    let mut open: Vec<DocxParagraph> = Vec::new();
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"p" => open.push(DocxParagraph::default()),
                b"t" => in_text = true,
                b"pStyle" => set_style(&mut open, attribute(&e, b"val")),
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"p" => paragraphs.push(DocxParagraph::default()),
                b"pStyle" => set_style(&mut open, attribute(&e, b"val")),
                b"tab" | b"br" | b"cr" => {
                    if let Some(paragraph) = open.last_mut() {
                        paragraph.text.push(' ');
                    }
                }
                _ => {}
            },
            Event::Text(text) if in_text => {
                if let Some(paragraph) = open.last_mut() {
                    paragraph.text.push_str(&text.unescape()?);
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => {
                    if let Some(paragraph) = open.pop() {
                        paragraphs.push(paragraph);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(paragraphs)
}

fn set_style(open: &mut [DocxParagraph], style: Option<String>) {
    if let Some(paragraph) = open.last_mut() {
        paragraph.style = style;
    }
}

pub fn extract(data: &[u8]) -> DocumentResult<Rendition> {
    let mut package = Package::open(data)?;
    let xml = package.read(DOCUMENT_PART)?;

    let mut flow = FlowDocument::new(PageSize::Letter);
    for paragraph in parse_paragraphs(&xml)? {
        let text = paragraph.text.trim();
        if text.is_empty() {
            flow.push(Block::Spacer(BLANK_PARAGRAPH_GAP));
            continue;
        }
        match paragraph.heading_level() {
            Some(level) => flow.push(Block::heading(level, text)),
            None => flow.push(Block::paragraph(text)),
        }
    }

    if flow.is_empty() {
        flow.push(Block::paragraph("(empty document)"));
    }
    Ok(Rendition::Flow(flow))
}
