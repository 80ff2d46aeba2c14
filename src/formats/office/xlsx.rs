//! Spreadsheets: one table per worksheet, cached cell values only

use std::collections::BTreeMap;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Deserialize;

use super::{attribute, Package};
use crate::document::{Block, DocumentResult, FlowDocument, PageSize, Rendition, Table};

const WORKBOOK_PART: &str = "xl/workbook.xml";
const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";

/// Rows read per sheet
pub const MAX_ROWS: usize = 200;

/// Columns read per sheet
pub const MAX_COLUMNS: usize = 10;

const AFTER_TITLE_GAP: f32 = 8.0;
const SHEET_GAP: f32 = 20.0;

#[derive(Debug, Deserialize)]
struct Workbook {
    #[serde(default)]
    sheets: Option<Sheets>,
}

#[derive(Debug, Deserialize)]
struct Sheets {
    #[serde(rename = "sheet", default)]
    items: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    #[serde(rename = "@name")]
    name: String,
    /// `r:id`, matched on its local name
    #[serde(rename = "@id")]
    rel_id: String,
}

/// A worksheet with its resolved part name
#[derive(Debug, Clone, PartialEq)]
pub struct SheetRef {
    pub name: String,
    pub part: String,
}

/// Worksheets in workbook order
pub fn sheets(package: &mut Package) -> DocumentResult<Vec<SheetRef>> {
    let xml = package.read(WORKBOOK_PART)?;
    let workbook: Workbook = quick_xml::de::from_str(&xml)?;
    let rels = package.relationships(WORKBOOK_PART)?;

    let sheets = workbook
        .sheets
        .map(|sheets| sheets.items)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|entry| {
            let rel = rels.iter().find(|rel| rel.id == entry.rel_id)?;
            Some(SheetRef {
                name: entry.name,
                part: rel.target.clone(),
            })
        })
        .collect();
    Ok(sheets)
}

/// The shared string table; rich text runs are concatenated
pub fn shared_strings(xml: &str) -> DocumentResult<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(false);

    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_text = false;
    // Phonetic runs repeat the text in another script
    let mut in_phonetic = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"si" => current.clear(),
                b"t" => in_text = !in_phonetic,
                b"rPh" => in_phonetic = true,
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Event::Text(text) if in_text => current.push_str(&text.unescape()?),
            Event::End(e) => match e.local_name().as_ref() {
                b"si" => strings.push(std::mem::take(&mut current)),
                b"t" => in_text = false,
                b"rPh" => in_phonetic = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(strings)
}

/// Zero-based column index of a cell reference such as `AB12`
pub fn column_index(reference: &str) -> Option<usize> {
    let letters: String = reference
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();
    if letters.is_empty() {
        return None;
    }
    // Malformed references with too many letters overflow and are rejected
    let number = letters.chars().try_fold(0usize, |acc, c| {
        let digit = c.to_ascii_uppercase() as usize - 'A' as usize + 1;
        acc.checked_mul(26)?.checked_add(digit)
    })?;
    Some(number - 1)
}

#[derive(Debug, Default)]
struct CellState {
    column: usize,
    kind: Option<String>,
    value: String,
    inline: String,
}

impl CellState {
    fn start(element: &BytesStart, next_column: usize) -> Self {
        let column = attribute(element, b"r")
            .and_then(|r| column_index(&r))
            .unwrap_or(next_column);
        Self {
            column,
            kind: attribute(element, b"t"),
            ..Self::default()
        }
    }

    fn display(self, shared: &[String]) -> String {
        match self.kind.as_deref() {
            Some("s") => self
                .value
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(|index| shared.get(index).cloned())
                .unwrap_or_default(),
            Some("inlineStr") => self.inline,
            Some("b") => match self.value.trim() {
                "1" => "True".to_string(),
                "0" => "False".to_string(),
                other => other.to_string(),
            },
            _ => self.value,
        }
    }
}

/// The top-left `MAX_ROWS` × `MAX_COLUMNS` block of a worksheet
///
/// Gaps between populated rows and cells are filled with empty strings, and
/// every row is padded to the widest row read.
pub fn read_cells(xml: &str, shared: &[String]) -> DocumentResult<Vec<Vec<String>>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(false);

    let mut rows: BTreeMap<usize, BTreeMap<usize, String>> = BTreeMap::new();
    let mut row_index = 0usize;
    let mut next_row = 0usize;
    let mut next_column = 0usize;
    let mut cell: Option<CellState> = None;
    let mut in_value = false;
    let mut in_inline_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"row" => {
                    row_index = attribute(&e, b"r")
                        .and_then(|r| r.trim().parse::<usize>().ok())
                        .map(|r| r.saturating_sub(1))
                        .unwrap_or(next_row);
                    next_row = row_index + 1;
                    next_column = 0;
                }
                b"c" => cell = Some(CellState::start(&e, next_column)),
                b"v" => in_value = true,
                b"t" => in_inline_text = cell.is_some(),
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"row" => {
                    next_row = attribute(&e, b"r")
                        .and_then(|r| r.trim().parse::<usize>().ok())
                        .unwrap_or(next_row + 1);
                }
                b"c" => {
                    let state = CellState::start(&e, next_column);
                    next_column = state.column + 1;
                }
                _ => {}
            },
            Event::Text(text) => {
                if let Some(state) = cell.as_mut() {
                    if in_value {
                        state.value.push_str(&text.unescape()?);
                    } else if in_inline_text {
                        state.inline.push_str(&text.unescape()?);
                    }
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"v" => in_value = false,
                b"t" => in_inline_text = false,
                b"c" => {
                    if let Some(state) = cell.take() {
                        next_column = state.column + 1;
                        if row_index < MAX_ROWS && state.column < MAX_COLUMNS {
                            let column = state.column;
                            let text = state.display(shared);
                            if !text.is_empty() {
                                rows.entry(row_index).or_default().insert(column, text);
                            }
                        }
                    }
                }
                b"sheetData" => break,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    let Some(&last_row) = rows.keys().next_back() else {
        return Ok(Vec::new());
    };
    let width = rows
        .values()
        .filter_map(|cells| cells.keys().next_back())
        .max()
        .map_or(0, |&column| column + 1);

    let table = (0..=last_row)
        .map(|index| {
            let cells = rows.get(&index);
            (0..width)
                .map(|column| {
                    cells
                        .and_then(|cells| cells.get(&column))
                        .cloned()
                        .unwrap_or_default()
                })
                .collect()
        })
        .collect();
    Ok(table)
}

pub fn extract(data: &[u8]) -> DocumentResult<Rendition> {
    let mut package = Package::open(data)?;
    let shared = match package.read_optional(SHARED_STRINGS_PART)? {
        Some(xml) => shared_strings(&xml)?,
        None => Vec::new(),
    };

    let mut flow = FlowDocument::new(PageSize::A4);
    for sheet in sheets(&mut package)? {
        flow.push(Block::heading(2, format!("Sheet: {}", sheet.name)));
        flow.push(Block::Spacer(AFTER_TITLE_GAP));

        let rows = match package.read_optional(&sheet.part)? {
            Some(xml) => read_cells(&xml, &shared)?,
            None => {
                tracing::debug!(sheet = %sheet.name, part = %sheet.part, "Worksheet part missing");
                Vec::new()
            }
        };
        if rows.is_empty() {
            flow.push(Block::paragraph("(empty sheet)"));
        } else {
            flow.push(Block::Table(Table::new(rows)));
        }
        flow.push(Block::Spacer(SHEET_GAP));
    }

    if flow.is_empty() {
        flow.push(Block::paragraph("(empty workbook)"));
    }
    Ok(Rendition::Flow(flow))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::office::testing::package;

    const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <workbookPr/>
  <sheets>
    <sheet name="Fruit" sheetId="1" r:id="rId1"/>
    <sheet name="Blank" sheetId="2" r:id="rId2"/>
  </sheets>
</workbook>"#;

    const RELS: &str = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="worksheet" Target="worksheets/sheet1.xml"/>
  <Relationship Id="rId2" Type="worksheet" Target="/xl/worksheets/sheet2.xml"/>
  <Relationship Id="rId3" Type="sharedStrings" Target="sharedStrings.xml"/>
</Relationships>"#;

    const SHARED: &str = r#"<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="3" uniqueCount="3">
  <si><t>name</t></si>
  <si><r><t>qty</t></r><r><t xml:space="preserve"> (kg)</t></r></si>
  <si><t>apples</t><rPh sb="0" eb="1"><t>APPLES</t></rPh></si>
</sst>"#;

    fn sheet(rows: &str) -> String {
        format!(
            r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{}</sheetData></worksheet>"#,
            rows
        )
    }

    #[test]
    fn test_column_index() {
        assert_eq!(column_index("A1"), Some(0));
        assert_eq!(column_index("J7"), Some(9));
        assert_eq!(column_index("AA3"), Some(26));
        assert_eq!(column_index("12"), None);
        assert_eq!(column_index("XFD1"), Some(16383));
        assert_eq!(column_index(&format!("{}1", "Z".repeat(20))), None);
    }

    #[test]
    fn test_shared_strings() {
        assert_eq!(shared_strings(SHARED).unwrap(), vec!["name", "qty (kg)", "apples"]);
    }

    #[test]
    fn test_cell_types() {
        let shared = shared_strings(SHARED).unwrap();
        let xml = sheet(
            r#"<row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c></row>
               <row r="2"><c r="A2" t="inlineStr"><is><t>pears</t></is></c><c r="B2"><v>2.5</v></c><c r="C2" t="b"><v>1</v></c></row>"#,
        );
        assert_eq!(
            read_cells(&xml, &shared).unwrap(),
            vec![
                vec!["name", "qty (kg)", ""],
                vec!["pears", "2.5", "True"],
            ]
        );
    }

    #[test]
    fn test_sparse_cells_are_padded() {
        let xml = sheet(r#"<row r="2"><c r="C2"><v>x</v></c></row><row r="4"><c r="A4"><v>y</v></c></row>"#);
        assert_eq!(
            read_cells(&xml, &[]).unwrap(),
            vec![
                vec!["", "", ""],
                vec!["", "", "x"],
                vec!["", "", ""],
                vec!["y", "", ""],
            ]
        );
    }

    #[test]
    fn test_malformed_reference_takes_next_column() {
        let long_ref = format!("{}1", "Q".repeat(30));
        let xml = sheet(&format!(
            r#"<row r="1"><c r="A1"><v>a</v></c><c r="{}"><v>b</v></c></row>"#,
            long_ref
        ));
        assert_eq!(read_cells(&xml, &[]).unwrap(), vec![vec!["a", "b"]]);
    }

    #[test]
    fn test_sheet_limits() {
        let rows: String = (1..=250)
            .map(|r| {
                let cells: String = (0..12u8)
                    .map(|c| format!(r#"<c r="{}{}"><v>{}</v></c>"#, (b'A' + c) as char, r, r))
                    .collect();
                format!(r#"<row r="{}">{}</row>"#, r, cells)
            })
            .collect();
        let table = read_cells(&sheet(&rows), &[]).unwrap();
        assert_eq!(table.len(), MAX_ROWS);
        assert!(table.iter().all(|row| row.len() == MAX_COLUMNS));
        assert_eq!(table[199][0], "200");
    }

    #[test]
    fn test_workbook_extraction() {
        let sheet1 = sheet(r#"<row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>2</v></c></row>"#);
        let sheet2 = sheet("");
        let data = package(&[
            ("xl/workbook.xml", WORKBOOK),
            ("xl/_rels/workbook.xml.rels", RELS),
            ("xl/sharedStrings.xml", SHARED),
            ("xl/worksheets/sheet1.xml", sheet1.as_str()),
            ("xl/worksheets/sheet2.xml", sheet2.as_str()),
        ]);

        let flow = match extract(&data).unwrap() {
            Rendition::Flow(flow) => flow,
            other => panic!("unexpected rendition {:?}", other),
        };
        assert_eq!(flow.page_size, PageSize::A4);
        assert_eq!(
            flow.blocks,
            vec![
                Block::heading(2, "Sheet: Fruit"),
                Block::Spacer(AFTER_TITLE_GAP),
                Block::Table(Table::new(vec![vec!["name".into(), "apples".into()]])),
                Block::Spacer(SHEET_GAP),
                Block::heading(2, "Sheet: Blank"),
                Block::Spacer(AFTER_TITLE_GAP),
                Block::paragraph("(empty sheet)"),
                Block::Spacer(SHEET_GAP),
            ]
        );
    }

    #[test]
    fn test_empty_workbook() {
        let workbook = r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheets/></workbook>"#;
        let data = package(&[("xl/workbook.xml", workbook)]);
        match extract(&data).unwrap() {
            Rendition::Flow(flow) => {
                assert_eq!(flow.blocks, vec![Block::paragraph("(empty workbook)")]);
            }
            other => panic!("unexpected rendition {:?}", other),
        }
    }
}
