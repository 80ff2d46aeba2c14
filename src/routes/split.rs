//! Split endpoints
//!
//! - POST /api/split/info - Page count and metadata of an uploaded PDF
//! - POST /api/split - Split an uploaded PDF by page

use std::path::PathBuf;

use axum::{
    extract::{Multipart, State},
    response::Response,
    routing::post,
    Json, Router,
};

use super::download::{file_response, write_zip};
use super::upload::{field_filename, is_pdf, save_field};
use super::{document_failure, run_blocking};
use crate::document::PdfInfo;
use crate::error::{AppError, Result};
use crate::pdf;
use crate::state::AppState;
use crate::workspace::JobWorkspace;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/split/info", post(pdf_info))
        .route("/split", post(split_pdf))
}

/// How to split, parsed from the form fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SplitMode {
    /// One file per page
    All,
    /// One file per listed 1-based page
    Specific(Vec<u32>),
    /// One file holding `start..=end`
    Range { start: u32, end: u32 },
}

/// Raw form fields of a split request
#[derive(Debug, Default)]
pub struct SplitForm {
    pub mode: Option<String>,
    pub pages: String,
    pub start: Option<String>,
    pub end: Option<String>,
}

fn parse_page_number(field: &str, value: Option<&str>) -> Result<u32> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(1),
        Some(v) => v
            .parse()
            .map_err(|_| AppError::BadRequest(format!("Invalid {} value: {}", field, v))),
    }
}

impl SplitForm {
    pub fn parse(&self) -> Result<SplitMode> {
        let mode = self
            .mode
            .as_deref()
            .ok_or_else(|| AppError::BadRequest("Missing field: mode".to_string()))?;

        match mode {
            "all" => Ok(SplitMode::All),
            "specific" => {
                let pages = self
                    .pages
                    .split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(|p| {
                        p.parse::<u32>().map_err(|_| {
                            AppError::BadRequest(format!("Invalid page number: {}", p))
                        })
                    })
                    .collect::<Result<Vec<u32>>>()?;
                if pages.is_empty() {
                    return Err(AppError::BadRequest("No pages specified".to_string()));
                }
                Ok(SplitMode::Specific(pages))
            }
            "range" => Ok(SplitMode::Range {
                start: parse_page_number("start", self.start.as_deref())?,
                end: parse_page_number("end", self.end.as_deref())?,
            }),
            other => Err(AppError::BadRequest(format!("Invalid mode: {}", other))),
        }
    }
}

/// Save the `file` field of a single-PDF upload into `input/`
async fn save_pdf_upload(
    job: &JobWorkspace,
    multipart: &mut Multipart,
    mut form: Option<&mut SplitForm>,
    max_bytes: u64,
) -> Result<PathBuf> {
    let input_dir = job.prepare_input().await?;
    let mut saved = None;

    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().map(str::to_string);
        match (field_name.as_deref(), form.as_deref_mut()) {
            (Some("file"), _) => {
                let name = field_filename(&field);
                if !is_pdf(&name) {
                    return Err(AppError::BadRequest(
                        "Only PDF files are accepted".to_string(),
                    ));
                }
                let dest = input_dir.join(&name);
                let upload = save_field(field, &name, &dest, max_bytes).await?;
                saved = Some(upload.path);
            }
            (Some("mode"), Some(form)) => form.mode = Some(field.text().await?),
            (Some("pages"), Some(form)) => form.pages = field.text().await?,
            (Some("start"), Some(form)) => form.start = Some(field.text().await?),
            (Some("end"), Some(form)) => form.end = Some(field.text().await?),
            _ => {}
        }
    }

    saved.ok_or_else(|| AppError::BadRequest("No file uploaded".to_string()))
}

/// POST /api/split/info
///
/// Multipart field `file`.
async fn pdf_info(State(state): State<AppState>, mut multipart: Multipart) -> Result<Json<PdfInfo>> {
    let job = state.workspaces().create_job_dir().await?;
    let max_bytes = state.config().http.max_file_bytes;
    let input = save_pdf_upload(&job, &mut multipart, None, max_bytes).await?;

    let info = run_blocking(move || {
        pdf::info(&input).map_err(|e| document_failure("Failed to read PDF", e))
    })
    .await?;

    tracing::debug!(job = %job.id(), pages = info.page_count, "Read PDF info");
    Ok(Json(info))
}

/// POST /api/split
///
/// Multipart fields `file`, `mode` (`all`, `specific` or `range`), `pages`
/// for `specific`, and `start`/`end` for `range`.
async fn split_pdf(State(state): State<AppState>, mut multipart: Multipart) -> Result<Response> {
    let job = state.workspaces().create_job_dir().await?;
    let mut form = SplitForm::default();
    let max_bytes = state.config().http.max_file_bytes;
    let input = save_pdf_upload(&job, &mut multipart, Some(&mut form), max_bytes).await?;
    let mode = form.parse()?;
    let output_dir = job.prepare_output().await?;

    tracing::info!(job = %job.id(), mode = ?mode, "Splitting PDF");

    let outputs = run_blocking(move || {
        let result = match mode {
            SplitMode::All => pdf::split_all(&input, &output_dir),
            SplitMode::Specific(pages) => pdf::split_pages(&input, &output_dir, &pages),
            SplitMode::Range { start, end } => {
                pdf::split_range(&input, &output_dir, start, end).map(|path| vec![path])
            }
        };
        result.map_err(|e| document_failure("Failed to split PDF", e))
    })
    .await?;

    if let [single] = outputs.as_slice() {
        let name = single
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("split.pdf")
            .to_string();
        return file_response(single, &name).await;
    }
    if outputs.is_empty() {
        return Err(AppError::Processing(
            "Failed to split PDF: document has no pages".to_string(),
        ));
    }

    let zip_path = job.join("split.zip");
    let archive = zip_path.clone();
    run_blocking(move || write_zip(&archive, &outputs)).await?;
    file_response(&zip_path, "split.zip").await
}
