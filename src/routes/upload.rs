//! Multipart upload helpers shared by the API handlers

use std::path::{Path, PathBuf};

use axum::extract::multipart::Field;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};

/// An uploaded file saved into a job workspace
#[derive(Debug, Clone)]
pub struct SavedUpload {
    /// Client-supplied filename, reduced to its final component
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
}

/// Strip directories and control characters from a client filename
pub fn sanitize_filename(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base.chars().filter(|c| !c.is_control()).collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Whether a filename ends in `.pdf`, in any case
pub fn is_pdf(name: &str) -> bool {
    name.to_ascii_lowercase().ends_with(".pdf")
}

pub fn field_filename(field: &Field<'_>) -> String {
    sanitize_filename(field.file_name().unwrap_or_default())
}

/// Stream a multipart field to `dest`
///
/// Fails with `FileTooLarge` as soon as more than `max_bytes` bytes
/// arrive; the partial file is removed.
pub async fn save_field(
    mut field: Field<'_>,
    name: &str,
    dest: &Path,
    max_bytes: u64,
) -> Result<SavedUpload> {
    let mut file = tokio::fs::File::create(dest).await?;
    let mut size: u64 = 0;

    while let Some(chunk) = field.chunk().await? {
        size += chunk.len() as u64;
        if size > max_bytes {
            drop(file);
            if let Err(e) = tokio::fs::remove_file(dest).await {
                tracing::debug!(path = %dest.display(), error = %e, "Failed to remove partial upload");
            }
            return Err(AppError::FileTooLarge {
                name: name.to_string(),
                max_mb: max_bytes.div_ceil(1024 * 1024),
            });
        }
        file.write_all(&chunk).await?;
    }
    file.flush().await?;

    tracing::debug!(file = %name, bytes = size, "Saved upload");
    Ok(SavedUpload {
        name: name.to_string(),
        path: dest.to_path_buf(),
        size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("report.pdf"), "report.pdf");
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\Users\\me\\notes.txt"), "notes.txt");
        assert_eq!(sanitize_filename("bad\u{0}name.md"), "badname.md");
        assert_eq!(sanitize_filename(""), "upload");
        assert_eq!(sanitize_filename("dir/.."), "upload");
    }

    #[test]
    fn test_is_pdf() {
        assert!(is_pdf("a.PDF"));
        assert!(!is_pdf("a.pdf.txt"));
    }
}
