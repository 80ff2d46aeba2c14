//! Conversion endpoint
//!
//! - POST /api/convert - Convert uploaded files to PDF
//!
//! One upload returns the PDF itself; several return `converted.zip`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use axum::{
    extract::{Multipart, State},
    response::Response,
    routing::post,
    Router,
};

use super::download::{file_response, write_zip};
use super::upload::{field_filename, save_field, SavedUpload};
use super::{document_failure, run_blocking};
use crate::error::{AppError, Result};
use crate::formats;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/convert", post(convert_files))
}

/// Output name for `input_name`, unique among `used`
///
/// `report.docx` and `report.md` in one request become `report.pdf` and
/// `report_2.pdf`.
fn output_name(input_name: &str, used: &mut HashSet<String>) -> String {
    let stem = Path::new(input_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("document");

    let mut candidate = format!("{}.pdf", stem);
    let mut n = 2;
    while !used.insert(candidate.to_ascii_lowercase()) {
        candidate = format!("{}_{}.pdf", stem, n);
        n += 1;
    }
    candidate
}

/// Input path for an upload; repeated names get an index prefix
fn input_path(input_dir: &Path, name: &str, index: usize, saved: &[SavedUpload]) -> PathBuf {
    if saved.iter().any(|upload| upload.name == name) {
        input_dir.join(format!("{}_{}", index, name))
    } else {
        input_dir.join(name)
    }
}

/// POST /api/convert
///
/// Multipart field `files`, repeated. Every file must have a convertible
/// extension and be at most 50MB.
async fn convert_files(State(state): State<AppState>, mut multipart: Multipart) -> Result<Response> {
    let job = state.workspaces().create_job_dir().await?;
    let input_dir = job.prepare_input().await?;
    let output_dir = job.prepare_output().await?;
    let max_bytes = state.config().http.max_file_bytes;

    let mut uploads: Vec<SavedUpload> = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("files") {
            continue;
        }
        let name = field_filename(&field);
        if !formats::is_supported(&name) {
            return Err(AppError::UnsupportedFormat(name));
        }
        let dest = input_path(&input_dir, &name, uploads.len(), &uploads);
        uploads.push(save_field(field, &name, &dest, max_bytes).await?);
    }

    if uploads.is_empty() {
        return Err(AppError::BadRequest("No files uploaded".to_string()));
    }

    tracing::info!(job = %job.id(), files = uploads.len(), "Converting files");

    let mut used = HashSet::new();
    let jobs: Vec<(SavedUpload, PathBuf)> = uploads
        .into_iter()
        .map(|upload| {
            let output = output_dir.join(output_name(&upload.name, &mut used));
            (upload, output)
        })
        .collect();

    let outputs = run_blocking(move || {
        jobs.into_iter()
            .map(|(upload, output)| {
                formats::convert_to_pdf(&upload.path, &output).map_err(|e| {
                    document_failure(&format!("Failed to convert {}", upload.name), e)
                })
            })
            .collect::<Result<Vec<PathBuf>>>()
    })
    .await?;

    if let [single] = outputs.as_slice() {
        let name = single
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("converted.pdf")
            .to_string();
        return file_response(single, &name).await;
    }

    let zip_path = job.join("converted.zip");
    let archive = zip_path.clone();
    run_blocking(move || write_zip(&archive, &outputs)).await?;
    file_response(&zip_path, "converted.zip").await
}
