//! Document Abstraction
//!
//! Neutral content model shared by the source format extractors
//! (`formats`) and the PDF writer (`pdf`).

pub mod error;
pub mod types;

pub use error::{DocumentError, DocumentResult};
pub use types::*;
