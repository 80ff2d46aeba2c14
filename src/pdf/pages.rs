//! PDF page operations
//!
//! Merge, split and inspect existing PDFs. Every output is rebuilt from
//! scratch by [`PageAssembler`]: each selected page is copied together with
//! the objects it references into a fresh page tree. The source page tree,
//! catalog and other pages are never copied.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId};

use crate::document::{DocumentError, DocumentResult, PdfInfo, PdfMetadata};

/// Page attributes a page may inherit from its ancestors in the page tree
const INHERITABLE: [&[u8]; 4] = [b"MediaBox", b"Resources", b"CropBox", b"Rotate"];

/// Letter, for pages that inherit no MediaBox at all
const FALLBACK_MEDIA_BOX: [i64; 4] = [0, 0, 612, 792];

/// Page tree depth past which a tree is treated as cyclic
const MAX_TREE_DEPTH: usize = 64;

// ============================================================================
// Source Documents
// ============================================================================

/// A loaded PDF ready to have pages copied out of it
///
/// Loaded once per request; any number of assemblers can read from it.
pub struct SourcePdf {
    doc: Document,
    pages: BTreeMap<u32, ObjectId>,
    /// Pages, page tree nodes and the catalog; references to these are dropped
    structural: BTreeSet<ObjectId>,
}

impl SourcePdf {
    pub fn new(doc: Document) -> Self {
        let pages = doc.get_pages();
        let mut structural: BTreeSet<ObjectId> = pages.values().copied().collect();
        if let Ok(root) = doc.trailer.get(b"Root").and_then(Object::as_reference) {
            structural.insert(root);
        }
        for &page_id in pages.values() {
            let mut node = parent_of(&doc, page_id);
            while let Some(id) = node {
                if !structural.insert(id) {
                    break;
                }
                node = parent_of(&doc, id);
            }
        }

        Self {
            doc,
            pages,
            structural,
        }
    }

    pub fn load(path: &Path) -> DocumentResult<Self> {
        Ok(Self::new(Document::load(path)?))
    }

    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn page_id(&self, page: u32) -> DocumentResult<ObjectId> {
        self.pages
            .get(&page)
            .copied()
            .ok_or(DocumentError::PageOutOfRange {
                page,
                total: self.page_count(),
            })
    }
}

fn parent_of(doc: &Document, id: ObjectId) -> Option<ObjectId> {
    doc.get_dictionary(id)
        .and_then(|node| node.get(b"Parent"))
        .and_then(Object::as_reference)
        .ok()
}

/// The page dictionary with inherited attributes copied in and `Parent` removed
fn flattened_page(doc: &Document, page_id: ObjectId) -> DocumentResult<Dictionary> {
    let mut page = doc.get_dictionary(page_id)?.clone();
    let mut missing: Vec<&[u8]> = INHERITABLE
        .iter()
        .copied()
        .filter(|key| !page.has(key))
        .collect();

    let mut parent = parent_of(doc, page_id);
    let mut depth = 0;
    while let Some(parent_id) = parent {
        depth += 1;
        if missing.is_empty() || depth > MAX_TREE_DEPTH {
            break;
        }
        let Ok(node) = doc.get_dictionary(parent_id) else {
            break;
        };
        missing.retain(|key| match node.get(key) {
            Ok(value) => {
                page.set(*key, value.clone());
                false
            }
            Err(_) => true,
        });
        parent = parent_of(doc, parent_id);
    }

    page.remove(b"Parent");
    if !page.has(b"MediaBox") {
        let media_box: Vec<Object> = FALLBACK_MEDIA_BOX.iter().map(|&v| v.into()).collect();
        page.set("MediaBox", media_box);
    }
    if !page.has(b"Resources") {
        page.set("Resources", Dictionary::new());
    }
    Ok(page)
}

/// Rewrite every reference inside `object`; `None` replaces it with null
fn remap_references(object: &mut Object, map: &mut dyn FnMut(ObjectId) -> Option<ObjectId>) {
    if let Object::Reference(id) = *object {
        *object = map(id).map_or(Object::Null, Object::Reference);
        return;
    }
    match object {
        Object::Array(items) => {
            for item in items.iter_mut() {
                remap_references(item, map);
            }
        }
        Object::Dictionary(dict) => {
            for (_, value) in dict.iter_mut() {
                remap_references(value, map);
            }
        }
        Object::Stream(stream) => {
            for (_, value) in stream.dict.iter_mut() {
                remap_references(value, map);
            }
        }
        _ => {}
    }
}

// ============================================================================
// Page Assembly
// ============================================================================

/// Collects pages from one or more source documents into a new document
pub struct PageAssembler {
    doc: Document,
    kids: Vec<ObjectId>,
}

impl Default for PageAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl PageAssembler {
    pub fn new() -> Self {
        Self {
            doc: Document::with_version("1.5"),
            kids: Vec::new(),
        }
    }

    /// Number of pages collected so far
    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// Append the given 1-based pages of `source`, in the given order
    ///
    /// Objects shared by several of the pages are copied once. A page listed
    /// twice becomes two pages.
    pub fn append(&mut self, source: &SourcePdf, pages: &[u32]) -> DocumentResult<()> {
        let mut copied: BTreeMap<ObjectId, ObjectId> = BTreeMap::new();
        let mut pending: Vec<ObjectId> = Vec::new();

        for &page in pages {
            let page_id = source.page_id(page)?;
            let mut object = Object::Dictionary(flattened_page(&source.doc, page_id)?);
            self.import(source, &mut object, &mut copied, &mut pending);
            let new_id = self.doc.add_object(object);
            self.kids.push(new_id);
        }

        while let Some(old_id) = pending.pop() {
            let (Some(&new_id), Some(original)) =
                (copied.get(&old_id), source.doc.objects.get(&old_id))
            else {
                continue;
            };
            let mut object = original.clone();
            self.import(source, &mut object, &mut copied, &mut pending);
            self.doc.objects.insert(new_id, object);
        }
        Ok(())
    }

    /// Append every page of `source`
    pub fn append_all(&mut self, source: &SourcePdf) -> DocumentResult<()> {
        let pages: Vec<u32> = source.pages.keys().copied().collect();
        self.append(source, &pages)
    }

    /// Point the references in `object` at copies, queueing objects not yet copied
    fn import(
        &mut self,
        source: &SourcePdf,
        object: &mut Object,
        copied: &mut BTreeMap<ObjectId, ObjectId>,
        pending: &mut Vec<ObjectId>,
    ) {
        let doc = &mut self.doc;
        remap_references(object, &mut |old_id| {
            if source.structural.contains(&old_id) || !source.doc.objects.contains_key(&old_id) {
                return None;
            }
            let new_id = *copied.entry(old_id).or_insert_with(|| {
                pending.push(old_id);
                doc.new_object_id()
            });
            Some(new_id)
        });
    }

    /// Build the page tree and catalog and return the finished document
    pub fn finish(mut self) -> DocumentResult<Document> {
        if self.kids.is_empty() {
            return Err(DocumentError::RenderError("no pages selected".to_string()));
        }

        let pages_id = self.doc.new_object_id();
        for kid in &self.kids {
            let page = self
                .doc
                .get_object_mut(*kid)
                .and_then(Object::as_dict_mut)?;
            page.set("Parent", pages_id);
        }

        let kids: Vec<Object> = self.kids.iter().map(|&id| id.into()).collect();
        let count = kids.len() as i64;
        self.doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        self.doc.trailer = Dictionary::new();
        self.doc.trailer.set("Root", catalog_id);

        self.doc.compress();
        Ok(self.doc)
    }

    /// Finish and write to `path`
    pub fn save(self, path: &Path) -> DocumentResult<()> {
        let mut doc = self.finish()?;
        doc.save(path)?;
        Ok(())
    }
}

// ============================================================================
// Operations
// ============================================================================

/// Decode a PDF text string: UTF-16BE with a byte order mark, else Latin-1
fn decode_text(bytes: &[u8]) -> String {
    match bytes.strip_prefix(&[0xFE, 0xFF]) {
        Some(utf16) => {
            let units: Vec<u16> = utf16
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        None => bytes.iter().map(|&b| b as char).collect(),
    }
}

fn info_string(info: &Dictionary, key: &[u8]) -> Option<String> {
    match info.get(key) {
        Ok(Object::String(bytes, _)) => Some(decode_text(bytes)),
        _ => None,
    }
    .map(|text| text.trim().to_string())
    .filter(|text| !text.is_empty())
}

/// Page count plus title and author from the Info dictionary
pub fn info(path: &Path) -> DocumentResult<PdfInfo> {
    let doc = Document::load(path)?;

    let info_dict = doc
        .trailer
        .get(b"Info")
        .ok()
        .and_then(|info| doc.dereference(info).ok())
        .and_then(|(_, object)| object.as_dict().ok());

    let metadata = match info_dict {
        Some(dict) => PdfMetadata {
            title: info_string(dict, b"Title"),
            author: info_string(dict, b"Author"),
        },
        None => PdfMetadata::default(),
    };

    Ok(PdfInfo {
        page_count: doc.get_pages().len() as u32,
        metadata,
    })
}

/// Concatenate every page of `inputs`, in order, into `output`
pub fn merge(inputs: &[PathBuf], output: &Path) -> DocumentResult<()> {
    let mut assembler = PageAssembler::new();
    for input in inputs {
        let source = SourcePdf::load(input)?;
        assembler.append_all(&source)?;
        tracing::debug!(
            file = %input.display(),
            pages = assembler.page_count(),
            "Appended PDF to merge"
        );
    }
    assembler.save(output)
}

fn write_single_page(source: &SourcePdf, page: u32, path: &Path) -> DocumentResult<()> {
    let mut assembler = PageAssembler::new();
    assembler.append(source, &[page])?;
    assembler.save(path)
}

/// One `page_<n>.pdf` per page of `input`
pub fn split_all(input: &Path, out_dir: &Path) -> DocumentResult<Vec<PathBuf>> {
    let source = SourcePdf::load(input)?;
    let total = source.page_count();

    let mut outputs = Vec::with_capacity(total as usize);
    for page in 1..=total {
        let path = out_dir.join(format!("page_{}.pdf", page));
        write_single_page(&source, page, &path)?;
        outputs.push(path);
    }
    Ok(outputs)
}

/// One `page_<n>.pdf` per requested 1-based page
///
/// Every page is checked before anything is written.
pub fn split_pages(input: &Path, out_dir: &Path, pages: &[u32]) -> DocumentResult<Vec<PathBuf>> {
    let source = SourcePdf::load(input)?;
    let total = source.page_count();

    if let Some(&page) = pages.iter().find(|&&page| page < 1 || page > total) {
        return Err(DocumentError::PageOutOfRange { page, total });
    }

    let mut outputs = Vec::with_capacity(pages.len());
    for &page in pages {
        let path = out_dir.join(format!("page_{}.pdf", page));
        write_single_page(&source, page, &path)?;
        outputs.push(path);
    }
    Ok(outputs)
}

/// Pages `start..=end` (1-based) into a single `pages_<start>-<end>.pdf`
pub fn split_range(input: &Path, out_dir: &Path, start: u32, end: u32) -> DocumentResult<PathBuf> {
    let source = SourcePdf::load(input)?;
    let total = source.page_count();

    if start < 1 || end > total || start > end {
        return Err(DocumentError::InvalidRange { start, end, total });
    }

    let pages: Vec<u32> = (start..=end).collect();
    let mut assembler = PageAssembler::new();
    assembler.append(&source, &pages)?;

    let path = out_dir.join(format!("pages_{}-{}.pdf", start, end));
    assembler.save(&path)?;
    Ok(path)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Block, FlowDocument, PageSize, Rendition};
    use crate::pdf::layout::write_pdf;
    use tempfile::TempDir;

    /// Write a PDF with one heading-only page per label
    fn sample_pdf(dir: &Path, name: &str, labels: &[&str]) -> PathBuf {
        let mut flow = FlowDocument::new(PageSize::Letter);
        for label in labels {
            flow.push(Block::heading(1, *label));
            // A spacer taller than the page forces a break
            flow.push(Block::Spacer(800.0));
        }
        let path = dir.join(name);
        write_pdf(&Rendition::Flow(flow), &path).unwrap();
        path
    }

    fn page_text(path: &Path, page: u32) -> String {
        Document::load(path).unwrap().extract_text(&[page]).unwrap()
    }

    #[test]
    fn test_sample_has_one_page_per_label() {
        let dir = TempDir::new().unwrap();
        let path = sample_pdf(dir.path(), "a.pdf", &["one", "two", "three"]);
        assert_eq!(info(&path).unwrap().page_count, 3);
    }

    #[test]
    fn test_info_reads_metadata() {
        let dir = TempDir::new().unwrap();
        let path = sample_pdf(dir.path(), "a.pdf", &["one"]);

        let mut doc = Document::load(&path).unwrap();
        let info_id = doc.add_object(dictionary! {
            "Title" => Object::string_literal("Quarterly Report"),
            "Author" => Object::string_literal("Finance"),
        });
        doc.trailer.set("Info", info_id);
        doc.save(&path).unwrap();

        let info = info(&path).unwrap();
        assert_eq!(info.page_count, 1);
        assert_eq!(info.metadata.title.as_deref(), Some("Quarterly Report"));
        assert_eq!(info.metadata.author.as_deref(), Some("Finance"));
    }

    #[test]
    fn test_info_without_metadata() {
        let dir = TempDir::new().unwrap();
        let path = sample_pdf(dir.path(), "a.pdf", &["one", "two"]);
        let info = info(&path).unwrap();
        assert_eq!(info.page_count, 2);
        assert_eq!(info.metadata, PdfMetadata::default());
    }

    #[test]
    fn test_info_rejects_garbage() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.pdf");
        std::fs::write(&path, b"not a pdf").unwrap();
        assert!(matches!(info(&path), Err(DocumentError::PdfError(_))));
    }

    #[test]
    fn test_merge_keeps_order() {
        let dir = TempDir::new().unwrap();
        let first = sample_pdf(dir.path(), "first.pdf", &["alpha", "beta"]);
        let second = sample_pdf(dir.path(), "second.pdf", &["gamma"]);
        let output = dir.path().join("merged.pdf");

        merge(&[second.clone(), first.clone()], &output).unwrap();

        assert_eq!(info(&output).unwrap().page_count, 3);
        assert!(page_text(&output, 1).contains("gamma"));
        assert!(page_text(&output, 2).contains("alpha"));
        assert!(page_text(&output, 3).contains("beta"));
    }

    #[test]
    fn test_split_all() {
        let dir = TempDir::new().unwrap();
        let input = sample_pdf(dir.path(), "in.pdf", &["one", "two", "three"]);
        let out_dir = dir.path().join("out");
        std::fs::create_dir(&out_dir).unwrap();

        let outputs = split_all(&input, &out_dir).unwrap();

        let names: Vec<_> = outputs
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["page_1.pdf", "page_2.pdf", "page_3.pdf"]);
        assert!(page_text(&outputs[1], 1).contains("two"));
        for output in &outputs {
            assert_eq!(info(output).unwrap().page_count, 1);
        }
    }

    #[test]
    fn test_split_specific_pages() {
        let dir = TempDir::new().unwrap();
        let input = sample_pdf(dir.path(), "in.pdf", &["one", "two", "three"]);

        let outputs = split_pages(&input, dir.path(), &[3, 1]).unwrap();

        assert_eq!(outputs.len(), 2);
        assert!(outputs[0].ends_with("page_3.pdf"));
        assert!(page_text(&outputs[0], 1).contains("three"));
        assert!(page_text(&outputs[1], 1).contains("one"));
    }

    #[test]
    fn test_split_specific_out_of_range() {
        let dir = TempDir::new().unwrap();
        let input = sample_pdf(dir.path(), "in.pdf", &["one", "two"]);

        let err = split_pages(&input, dir.path(), &[1, 5]).unwrap_err();
        assert_eq!(err.to_string(), "Page 5 out of range (1-2)");
        assert!(!dir.path().join("page_1.pdf").exists());

        let err = split_pages(&input, dir.path(), &[0]).unwrap_err();
        assert_eq!(err.to_string(), "Page 0 out of range (1-2)");
    }

    #[test]
    fn test_split_range() {
        let dir = TempDir::new().unwrap();
        let input = sample_pdf(dir.path(), "in.pdf", &["one", "two", "three", "four"]);

        let output = split_range(&input, dir.path(), 2, 3).unwrap();

        assert!(output.ends_with("pages_2-3.pdf"));
        assert_eq!(info(&output).unwrap().page_count, 2);
        assert!(page_text(&output, 1).contains("two"));
        assert!(page_text(&output, 2).contains("three"));
    }

    #[test]
    fn test_split_range_rejects_invalid() {
        let dir = TempDir::new().unwrap();
        let input = sample_pdf(dir.path(), "in.pdf", &["one", "two"]);

        for (start, end) in [(0, 1), (2, 1), (1, 3)] {
            let err = split_range(&input, dir.path(), start, end).unwrap_err();
            assert_eq!(
                err.to_string(),
                format!("Invalid range {}-{} for PDF with 2 pages", start, end)
            );
        }
    }

    #[test]
    fn test_split_pages_inherit_media_box() {
        let dir = TempDir::new().unwrap();
        let input = sample_pdf(dir.path(), "in.pdf", &["one", "two"]);
        let outputs = split_all(&input, dir.path()).unwrap();

        let doc = Document::load(&outputs[0]).unwrap();
        let page_id = *doc.get_pages().get(&1).unwrap();
        let page = doc.get_dictionary(page_id).unwrap();
        assert!(page.has(b"MediaBox"));
        assert!(page.has(b"Resources"));
    }

    #[test]
    fn test_empty_assembler_fails() {
        assert!(PageAssembler::new().finish().is_err());
    }

    #[test]
    fn test_single_page_copies_only_what_it_references() {
        let dir = TempDir::new().unwrap();
        let labels: Vec<String> = (1..=30).map(|i| format!("page {}", i)).collect();
        let labels: Vec<&str> = labels.iter().map(String::as_str).collect();
        let input = sample_pdf(dir.path(), "in.pdf", &labels);
        let source = SourcePdf::load(&input).unwrap();

        let mut assembler = PageAssembler::new();
        assembler.append(&source, &[7]).unwrap();
        let doc = assembler.finish().unwrap();

        assert_eq!(doc.get_pages().len(), 1);
        // None of the other 29 pages come along
        assert!(doc.objects.len() * 4 < source.doc.objects.len());
        let text = doc.extract_text(&[1]).unwrap();
        assert!(text.contains("page 7"));
        assert!(!text.contains("page 8"));
    }

    #[test]
    fn test_back_references_to_other_pages_are_dropped() {
        let dir = TempDir::new().unwrap();
        let input = sample_pdf(dir.path(), "in.pdf", &["one", "two"]);
        let mut doc = Document::load(&input).unwrap();
        let pages = doc.get_pages();
        let (first, second) = (pages[&1], pages[&2]);
        let link = doc.add_object(dictionary! {
            "Type" => "Annot",
            "Subtype" => "Link",
            "P" => first,
            "Dest" => vec![Object::Reference(second), "Fit".into()],
        });
        doc.get_object_mut(first)
            .and_then(Object::as_dict_mut)
            .unwrap()
            .set("Annots", vec![Object::Reference(link)]);

        let source = SourcePdf::new(doc);
        let mut assembler = PageAssembler::new();
        assembler.append(&source, &[1]).unwrap();
        let out = assembler.finish().unwrap();

        assert_eq!(out.get_pages().len(), 1);
        let annotation = out
            .objects
            .values()
            .filter_map(|object| object.as_dict().ok())
            .find(|dict| matches!(dict.get(b"Type").and_then(Object::as_name), Ok(b"Annot")))
            .unwrap();
        assert!(matches!(annotation.get(b"P"), Ok(Object::Null)));
        let dest = annotation.get(b"Dest").and_then(Object::as_array).unwrap();
        assert!(matches!(dest[0], Object::Null));
    }

    #[test]
    fn test_repeated_page_becomes_two_pages() {
        let dir = TempDir::new().unwrap();
        let input = sample_pdf(dir.path(), "in.pdf", &["one", "two"]);
        let source = SourcePdf::load(&input).unwrap();

        let mut assembler = PageAssembler::new();
        assembler.append(&source, &[2, 2]).unwrap();
        let doc = assembler.finish().unwrap();

        let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
        assert_eq!(pages.len(), 2);
        assert_ne!(pages[0], pages[1]);
        assert!(doc.extract_text(&[2]).unwrap().contains("two"));
    }
}
