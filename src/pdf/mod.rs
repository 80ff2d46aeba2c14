//! PDF output and page operations
//!
//! - `layout`: renders a [`Rendition`](crate::document::Rendition) into a new PDF
//! - `pages`: merge, split and inspect existing PDFs

pub mod layout;
pub mod pages;

pub use layout::{render, render_to_bytes, write_pdf};
pub use pages::{info, merge, split_all, split_pages, split_range, PageAssembler, SourcePdf};
