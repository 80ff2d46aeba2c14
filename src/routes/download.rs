//! File download responses and ZIP bundles

use std::collections::HashSet;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use axum::{
    body::Body,
    http::{header, StatusCode},
    response::Response,
};
use tokio_util::io::ReaderStream;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::error::{AppError, Result};

/// `Content-Disposition` for an attachment, with an RFC 5987 UTF-8 name
pub fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '_',
        })
        .collect();
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(filename)
    )
}

/// Stream a file from a job workspace as a download named `download_name`
pub async fn file_response(path: &Path, download_name: &str) -> Result<Response> {
    let file = tokio::fs::File::open(path).await?;
    let length = file.metadata().await?.len();
    let content_type = mime_guess::from_path(download_name).first_or_octet_stream();

    tracing::debug!(
        file = %path.display(),
        name = %download_name,
        bytes = length,
        "Sending download"
    );

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type.as_ref())
        .header(header::CONTENT_LENGTH, length)
        .header(header::CONTENT_DISPOSITION, content_disposition(download_name))
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| AppError::Internal(e.to_string()))
}

/// Write `files` into a new ZIP at `zip_path`, each under its file name
///
/// Later files whose name is already in the archive are skipped.
pub fn write_zip(zip_path: &Path, files: &[PathBuf]) -> Result<()> {
    let mut writer = ZipWriter::new(File::create(zip_path)?);
    let options = SimpleFileOptions::default();
    let mut seen = HashSet::new();

    for path in files {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !seen.insert(name.to_string()) {
            continue;
        }
        writer.start_file(name, options).map_err(zip_error)?;
        io::copy(&mut File::open(path)?, &mut writer)?;
    }
    writer.finish().map_err(zip_error)?;
    Ok(())
}

fn zip_error(err: zip::result::ZipError) -> AppError {
    AppError::Internal(format!("Failed to build archive: {}", err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;
    use zip::ZipArchive;

    #[test]
    fn test_content_disposition() {
        assert_eq!(
            content_disposition("merged.pdf"),
            "attachment; filename=\"merged.pdf\"; filename*=UTF-8''merged.pdf"
        );
        assert_eq!(
            content_disposition("résumé \"v2\".pdf"),
            "attachment; filename=\"r_sum_ _v2_.pdf\"; filename*=UTF-8''r%C3%A9sum%C3%A9%20%22v2%22.pdf"
        );
    }

    #[test]
    fn test_write_zip_skips_duplicates() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.pdf");
        let nested = dir.path().join("nested");
        std::fs::create_dir(&nested).unwrap();
        let a_again = nested.join("a.pdf");
        let b = dir.path().join("b.pdf");
        std::fs::write(&a, b"first").unwrap();
        std::fs::write(&a_again, b"second").unwrap();
        std::fs::write(&b, b"bee").unwrap();

        let zip_path = dir.path().join("out.zip");
        write_zip(&zip_path, &[a, a_again, b]).unwrap();

        let mut archive = ZipArchive::new(File::open(&zip_path).unwrap()).unwrap();
        let mut names: Vec<_> = archive.file_names().map(str::to_string).collect();
        names.sort();
        assert_eq!(names, vec!["a.pdf", "b.pdf"]);

        let mut content = String::new();
        archive.by_name("a.pdf").unwrap().read_to_string(&mut content).unwrap();
        assert_eq!(content, "first");
    }

    #[tokio::test]
    async fn test_file_response_headers() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("split.zip");
        std::fs::write(&path, b"PK\x05\x06").unwrap();

        let response = file_response(&path, "split.zip").await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], "application/zip");
        assert_eq!(headers[header::CONTENT_LENGTH], "4");
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"PK\x05\x06");
    }
}
