//! HTML: strip markup down to text paragraphs
//!
//! Tags are removed with `lol_html`. Block-level elements are replaced by a
//! paragraph separator so that each block becomes one paragraph, while
//! whitespace inside a block (including source line breaks) collapses to
//! single spaces.

use lol_html::html_content::ContentType;
use lol_html::{doc_comments, doctype, element, rewrite_str, RewriteStrSettings};

use crate::document::{Block, DocumentError, DocumentResult, FlowDocument, PageSize, Rendition};

/// Marker inserted around block elements before text is collapsed
const BREAK: &str = "\u{2029}";

/// Gap after every paragraph
const PARAGRAPH_GAP: f32 = 6.0;

/// Elements whose whole subtree is dropped
const DROPPED: &[&str] = &["script", "style", "head", "title", "template", "noscript"];

const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption",
    "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main",
    "nav", "ol", "p", "pre", "section", "table", "td", "th", "tr", "ul",
];

/// Reduce an HTML string to its text, one entry per non-empty block
pub fn html_to_text_blocks(html: &str) -> DocumentResult<Vec<String>> {
    let stripped = rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!("*", |el| {
                let tag = el.tag_name();
                if DROPPED.contains(&tag.as_str()) {
                    el.remove();
                    return Ok(());
                }
                if BLOCK_ELEMENTS.contains(&tag.as_str()) {
                    el.before(BREAK, ContentType::Text);
                    el.after(BREAK, ContentType::Text);
                }
                el.remove_and_keep_content();
                Ok(())
            })],
            document_content_handlers: vec![
                doctype!(|doctype| {
                    doctype.remove();
                    Ok(())
                }),
                doc_comments!(|comment| {
                    comment.remove();
                    Ok(())
                }),
            ],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|e| DocumentError::ParseError(format!("invalid HTML: {}", e)))?;

    let blocks = stripped
        .split(BREAK)
        .map(|segment| {
            let decoded = html_escape::decode_html_entities(segment);
            decoded.split_whitespace().collect::<Vec<_>>().join(" ")
        })
        .filter(|text| !text.is_empty())
        .collect();
    Ok(blocks)
}

/// Lay out an HTML string
pub fn render_html(html: &str) -> DocumentResult<Rendition> {
    let mut flow = FlowDocument::new(PageSize::Letter);
    for text in html_to_text_blocks(html)? {
        flow.push(Block::Paragraph(text));
        flow.push(Block::Spacer(PARAGRAPH_GAP));
    }
    if flow.is_empty() {
        flow.push(Block::paragraph("(empty document)"));
    }
    Ok(Rendition::Flow(flow))
}

pub fn extract(data: &[u8]) -> DocumentResult<Rendition> {
    render_html(&String::from_utf8_lossy(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocks_become_paragraphs() {
        let html = "<!DOCTYPE html><html><head><title>T</title><style>p{}</style></head>\
                    <body><h1>Title</h1><p>First\n   paragraph</p><div>Second<br>Third</div></body></html>";
        let blocks = html_to_text_blocks(html).unwrap();
        assert_eq!(blocks, vec!["Title", "First paragraph", "Second", "Third"]);
    }

    #[test]
    fn test_scripts_and_comments_dropped() {
        let html = "<p>keep</p><script>alert('x')</script><!-- hidden --><p>also</p>";
        assert_eq!(html_to_text_blocks(html).unwrap(), vec!["keep", "also"]);
    }

    #[test]
    fn test_entities_decoded() {
        let html = "<p>Fish &amp; Chips&nbsp;&lt;3 &#233;</p>";
        assert_eq!(html_to_text_blocks(html).unwrap(), vec!["Fish & Chips <3 é"]);
    }

    #[test]
    fn test_inline_markup_stays_in_paragraph() {
        let html = "<p>a <b>bold</b> <a href=\"#\">link</a></p>";
        assert_eq!(html_to_text_blocks(html).unwrap(), vec!["a bold link"]);
    }

    #[test]
    fn test_empty_document_placeholder() {
        let rendition = extract(b"<html><body>  </body></html>").unwrap();
        match rendition {
            Rendition::Flow(flow) => {
                assert_eq!(flow.blocks, vec![Block::paragraph("(empty document)")]);
            }
            other => panic!("unexpected rendition {:?}", other),
        }
    }

    #[test]
    fn test_paragraphs_followed_by_spacing() {
        match extract(b"<p>one</p><p>two</p>").unwrap() {
            Rendition::Flow(flow) => assert_eq!(
                flow.blocks,
                vec![
                    Block::paragraph("one"),
                    Block::Spacer(PARAGRAPH_GAP),
                    Block::paragraph("two"),
                    Block::Spacer(PARAGRAPH_GAP),
                ]
            ),
            other => panic!("unexpected rendition {:?}", other),
        }
    }
}
