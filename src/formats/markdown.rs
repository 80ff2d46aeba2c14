//! Markdown: rendered to HTML, then handled as HTML

use pulldown_cmark::{html, Options, Parser};

use crate::document::{DocumentResult, Rendition};

use super::html::render_html;

pub fn markdown_to_html(text: &str) -> String {
    let parser = Parser::new_ext(text, Options::ENABLE_TABLES);
    let mut out = String::with_capacity(text.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

pub fn extract(data: &[u8]) -> DocumentResult<Rendition> {
    render_html(&markdown_to_html(&String::from_utf8_lossy(data)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Block;
    use crate::formats::html::html_to_text_blocks;

    #[test]
    fn test_markdown_structure() {
        let md = "# Notes\n\nSome *emphasis* here.\n\n- one\n- two\n\n```\nlet x = 1;\n```\n";
        let blocks = html_to_text_blocks(&markdown_to_html(md)).unwrap();
        assert_eq!(blocks, vec!["Notes", "Some emphasis here.", "one", "two", "let x = 1;"]);
    }

    #[test]
    fn test_markdown_tables() {
        let md = "| a | b |\n|---|---|\n| 1 | 2 |\n";
        let html = markdown_to_html(md);
        assert!(html.contains("<table>"));
        let blocks = html_to_text_blocks(&html).unwrap();
        assert_eq!(blocks, vec!["a", "b", "1", "2"]);
    }

    #[test]
    fn test_empty_markdown() {
        match extract(b"").unwrap() {
            Rendition::Flow(flow) => {
                assert_eq!(flow.blocks, vec![Block::paragraph("(empty document)")]);
            }
            other => panic!("unexpected rendition {:?}", other),
        }
    }
}
