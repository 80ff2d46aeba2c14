//! CSV: shaded-header tables on A4

use csv::{ByteRecord, ReaderBuilder};

use crate::document::{Block, DocumentResult, FlowDocument, PageSize, Rendition, Table};

/// Columns beyond this are dropped
pub const MAX_COLUMNS: usize = 10;

/// Rows per table chunk
pub const ROWS_PER_TABLE: usize = 50;

const TABLE_GAP: f32 = 12.0;

/// Read all rows; ragged rows are allowed and bytes are decoded lossily
pub fn read_rows(data: &[u8]) -> DocumentResult<Vec<Vec<String>>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(data);

    let mut rows = Vec::new();
    let mut record = ByteRecord::new();
    while reader.read_byte_record(&mut record)? {
        let row = record
            .iter()
            .take(MAX_COLUMNS)
            .map(|field| String::from_utf8_lossy(field).into_owned())
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

pub fn extract(data: &[u8]) -> DocumentResult<Rendition> {
    let mut rows = read_rows(data)?;
    if rows.is_empty() {
        rows.push(vec!["(empty file)".to_string()]);
    }

    let mut flow = FlowDocument::new(PageSize::A4);
    for chunk in rows.chunks(ROWS_PER_TABLE) {
        flow.push(Block::Table(Table::new(chunk.to_vec())));
        flow.push(Block::Spacer(TABLE_GAP));
    }
    Ok(Rendition::Flow(flow))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables(rendition: Rendition) -> Vec<Table> {
        match rendition {
            Rendition::Flow(flow) => {
                assert_eq!(flow.page_size, PageSize::A4);
                flow.blocks
                    .into_iter()
                    .filter_map(|block| match block {
                        Block::Table(table) => Some(table),
                        _ => None,
                    })
                    .collect()
            }
            other => panic!("unexpected rendition {:?}", other),
        }
    }

    #[test]
    fn test_quoted_fields_and_ragged_rows() {
        let rows = read_rows(b"name,note\n\"Smith, J\",\"said \"\"hi\"\"\"\nsolo\n").unwrap();
        assert_eq!(
            rows,
            vec![
                vec!["name".to_string(), "note".to_string()],
                vec!["Smith, J".to_string(), "said \"hi\"".to_string()],
                vec!["solo".to_string()],
            ]
        );
    }

    #[test]
    fn test_wide_rows_truncated() {
        let line: Vec<String> = (0..15).map(|i| i.to_string()).collect();
        let rows = read_rows(line.join(",").as_bytes()).unwrap();
        assert_eq!(rows[0].len(), MAX_COLUMNS);
        assert_eq!(rows[0].last().map(String::as_str), Some("9"));
    }

    #[test]
    fn test_rows_chunked_into_tables() {
        let data: String = (0..120).map(|i| format!("{},x\n", i)).collect();
        let tables = tables(extract(data.as_bytes()).unwrap());
        let sizes: Vec<usize> = tables.iter().map(|t| t.rows.len()).collect();
        assert_eq!(sizes, vec![50, 50, 20]);
        assert_eq!(tables[1].rows[0][0], "50");
    }

    #[test]
    fn test_empty_file_placeholder() {
        let tables = tables(extract(b"").unwrap());
        assert_eq!(tables, vec![Table::new(vec![vec!["(empty file)".to_string()]])]);
    }
}
