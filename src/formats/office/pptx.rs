//! Presentations: the text of every slide, in presentation order

use quick_xml::events::Event;
use quick_xml::Reader;

use super::{Package, Relationship};
use crate::document::{Block, DocumentResult, FlowDocument, PageSize, Rendition};

const PRESENTATION_PART: &str = "ppt/presentation.xml";
const SLIDE_PREFIX: &str = "ppt/slides/slide";

const AFTER_TITLE_GAP: f32 = 8.0;
const PARAGRAPH_GAP: f32 = 4.0;
const SLIDE_GAP: f32 = 20.0;

/// Relationship ids of `sldIdLst` entries, in presentation order
fn slide_rel_ids(xml: &str) -> DocumentResult<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    let mut ids = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sldId" => {
                // `id` is the slide id, `r:id` the relationship
                let rel_id = e
                    .attributes()
                    .flatten()
                    .find(|attr| attr.key.prefix().is_some() && attr.key.local_name().as_ref() == b"id")
                    .and_then(|attr| attr.unescape_value().ok().map(|v| v.into_owned()));
                ids.extend(rel_id);
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(ids)
}

/// Number in a `ppt/slides/slideN.xml` part name
fn slide_number(part: &str) -> Option<u32> {
    part.strip_prefix(SLIDE_PREFIX)?
        .strip_suffix(".xml")?
        .parse()
        .ok()
}

/// Slide part names in presentation order
///
/// Follows `sldIdLst` through the presentation relationships. Packages
/// without a usable list fall back to numeric part-name order.
pub fn slide_parts(package: &mut Package) -> DocumentResult<Vec<String>> {
    if let Some(xml) = package.read_optional(PRESENTATION_PART)? {
        let rels: Vec<Relationship> = package.relationships(PRESENTATION_PART)?;
        let ordered: Vec<String> = slide_rel_ids(&xml)?
            .iter()
            .filter_map(|rel_id| rels.iter().find(|rel| &rel.id == rel_id))
            .map(|rel| rel.target.clone())
            .collect();
        if !ordered.is_empty() {
            return Ok(ordered);
        }
    }

    let mut numbered: Vec<(u32, String)> = package
        .part_names()
        .into_iter()
        .filter_map(|name| slide_number(&name).map(|n| (n, name)))
        .collect();
    numbered.sort();
    Ok(numbered.into_iter().map(|(_, name)| name).collect())
}

/// Text paragraphs of one slide, including empty ones
pub fn slide_paragraphs(xml: &str) -> DocumentResult<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(false);

    let mut paragraphs = Vec::new();
    let mut current: Option<String> = None;
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"p" => current = Some(String::new()),
                b"t" => in_text = true,
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"p" => paragraphs.push(String::new()),
                b"br" => {
                    if let Some(text) = current.as_mut() {
                        text.push(' ');
                    }
                }
                _ => {}
            },
            Event::Text(text) if in_text => {
                if let Some(current) = current.as_mut() {
                    current.push_str(&text.unescape()?);
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => {
                    if let Some(text) = current.take() {
                        paragraphs.push(text);
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

pub fn extract(data: &[u8]) -> DocumentResult<Rendition> {
    let mut package = Package::open(data)?;
    let mut flow = FlowDocument::new(PageSize::Letter);

    for (index, part) in slide_parts(&mut package)?.iter().enumerate() {
        let Some(xml) = package.read_optional(part)? else {
            tracing::debug!(part = %part, "Slide part listed but missing");
            continue;
        };

        flow.push(Block::heading(2, format!("Slide {}", index + 1)));
        flow.push(Block::Spacer(AFTER_TITLE_GAP));
        for paragraph in slide_paragraphs(&xml)? {
            let text = paragraph.trim();
            if !text.is_empty() {
                flow.push(Block::paragraph(text));
                flow.push(Block::Spacer(PARAGRAPH_GAP));
            }
        }
        flow.push(Block::Spacer(SLIDE_GAP));
    }

    if flow.is_empty() {
        flow.push(Block::paragraph("(empty presentation)"));
    }
    Ok(Rendition::Flow(flow))
}
