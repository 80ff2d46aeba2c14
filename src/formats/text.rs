//! Plain text: one monospace line per source line

use crate::document::{Block, FlowDocument, PageSize, Rendition};

/// Invalid UTF-8 is replaced rather than rejected
pub fn extract(data: &[u8]) -> Rendition {
    let text = String::from_utf8_lossy(data);
    let text = text.strip_prefix('\u{feff}').unwrap_or(&text);

    let mut flow = FlowDocument::new(PageSize::Letter);
    for line in text.split('\n') {
        flow.push(Block::Preformatted(line.trim_end_matches('\r').to_string()));
    }
    Rendition::Flow(flow)
}
