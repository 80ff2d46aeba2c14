//! Office Open XML packages
//!
//! `.docx`, `.xlsx` and `.pptx` files are ZIP containers of XML parts. Only
//! the text-bearing parts are read; styles, drawings and embedded media are
//! ignored.

pub mod docx;
pub mod pptx;
pub mod xlsx;

use std::io::{Cursor, Read};

use quick_xml::events::BytesStart;
use serde::Deserialize;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::document::{DocumentError, DocumentResult};

/// A relationship entry from a `_rels/*.rels` part
#[derive(Debug, Clone, Deserialize)]
pub struct Relationship {
    #[serde(rename = "@Id")]
    pub id: String,
    #[serde(rename = "@Target")]
    pub target: String,
}

#[derive(Debug, Deserialize)]
struct Relationships {
    #[serde(rename = "Relationship", default)]
    items: Vec<Relationship>,
}

/// Read access to the parts of an OOXML package held in memory
pub struct Package<'a> {
    archive: ZipArchive<Cursor<&'a [u8]>>,
}

impl<'a> Package<'a> {
    pub fn open(data: &'a [u8]) -> DocumentResult<Self> {
        let archive = ZipArchive::new(Cursor::new(data))?;
        Ok(Self { archive })
    }

    /// Read a part as UTF-8 text; `None` if the part does not exist
    pub fn read_optional(&mut self, path: &str) -> DocumentResult<Option<String>> {
        let mut file = match self.archive.by_name(path) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut content = String::new();
        file.read_to_string(&mut content)?;
        Ok(Some(content))
    }

    /// Read a part that must exist
    pub fn read(&mut self, path: &str) -> DocumentResult<String> {
        self.read_optional(path)?
            .ok_or_else(|| DocumentError::ParseError(format!("missing package part: {}", path)))
    }

    pub fn part_names(&self) -> Vec<String> {
        self.archive.file_names().map(str::to_string).collect()
    }

    /// Relationships of `part`, read from its sibling `_rels` folder
    ///
    /// Targets are resolved to absolute part names.
    pub fn relationships(&mut self, part: &str) -> DocumentResult<Vec<Relationship>> {
        let (dir, file) = part.rsplit_once('/').unwrap_or(("", part));
        let rels_path = if dir.is_empty() {
            format!("_rels/{}.rels", file)
        } else {
            format!("{}/_rels/{}.rels", dir, file)
        };

        let Some(xml) = self.read_optional(&rels_path)? else {
            return Ok(Vec::new());
        };
        let rels: Relationships = quick_xml::de::from_str(&xml)?;
        Ok(rels
            .items
            .into_iter()
            .map(|rel| Relationship {
                target: resolve_target(dir, &rel.target),
                id: rel.id,
            })
            .collect())
    }
}

/// Resolve a relationship target against the directory of its source part
pub fn resolve_target(base_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// Value of an attribute, matched on its local name
pub fn attribute(element: &BytesStart, name: &[u8]) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == name)
        .and_then(|attr| attr.unescape_value().ok().map(|v| v.into_owned()))
}

#[cfg(test)]
pub(crate) mod testing {
    //! Builds minimal OOXML packages for tests

    use std::io::{Cursor, Write};

    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    pub fn package(parts: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in parts {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_target() {
        assert_eq!(resolve_target("xl", "worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
        assert_eq!(resolve_target("xl", "/xl/worksheets/sheet2.xml"), "xl/worksheets/sheet2.xml");
        assert_eq!(resolve_target("ppt/slides", "../media/image1.png"), "ppt/media/image1.png");
        assert_eq!(resolve_target("", "word/document.xml"), "word/document.xml");
    }

    #[test]
    fn test_relationships() {
        let data = testing::package(&[(
            "xl/_rels/workbook.xml.rels",
            r#"<?xml version="1.0"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="worksheet" Target="worksheets/sheet1.xml"/>
  <Relationship Id="rId2" Type="styles" Target="styles.xml"/>
</Relationships>"#,
        )]);
        let mut package = Package::open(&data).unwrap();

        let rels = package.relationships("xl/workbook.xml").unwrap();
        assert_eq!(rels.len(), 2);
        assert_eq!(rels[0].id, "rId1");
        assert_eq!(rels[0].target, "xl/worksheets/sheet1.xml");

        assert!(package.relationships("xl/missing.xml").unwrap().is_empty());
    }

    #[test]
    fn test_missing_part() {
        let data = testing::package(&[("a.xml", "<a/>")]);
        let mut package = Package::open(&data).unwrap();
        assert_eq!(package.read("a.xml").unwrap(), "<a/>");
        assert!(package.read_optional("b.xml").unwrap().is_none());
        assert!(matches!(package.read("b.xml"), Err(DocumentError::ParseError(_))));
    }

    #[test]
    fn test_not_a_zip() {
        assert!(matches!(
            Package::open(b"plain text"),
            Err(DocumentError::ParseError(_))
        ));
    }
}
