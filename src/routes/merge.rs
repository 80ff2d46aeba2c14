//! Merge endpoint
//!
//! - POST /api/merge - Concatenate uploaded PDFs into `merged.pdf`

use std::path::PathBuf;

use axum::{
    extract::{Multipart, State},
    response::Response,
    routing::post,
    Router,
};

use super::download::file_response;
use super::upload::{field_filename, is_pdf, save_field};
use super::{document_failure, run_blocking};
use crate::error::{AppError, Result};
use crate::pdf;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/merge", post(merge_pdfs))
}

/// Apply a comma-separated list of zero-based indices to `count` files
///
/// A blank list keeps upload order. Indices may repeat or omit files.
/// `None` if any entry is not an index below `count`.
pub fn parse_order(order: &str, count: usize) -> Option<Vec<usize>> {
    if order.trim().is_empty() {
        return Some((0..count).collect());
    }
    order
        .split(',')
        .map(|entry| {
            entry
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|&index| index < count)
        })
        .collect()
}

/// POST /api/merge
///
/// Multipart fields `files` (at least two PDFs) and optional `order`.
async fn merge_pdfs(State(state): State<AppState>, mut multipart: Multipart) -> Result<Response> {
    let job = state.workspaces().create_job_dir().await?;
    let input_dir = job.prepare_input().await?;
    let max_bytes = state.config().http.max_file_bytes;

    let mut saved: Vec<PathBuf> = Vec::new();
    let mut order = String::new();
    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some("files") => {
                let name = field_filename(&field);
                if !is_pdf(&name) {
                    return Err(AppError::BadRequest(format!(
                        "Only PDF files accepted, got: {}",
                        name
                    )));
                }
                let dest = input_dir.join(format!("{}_{}", saved.len(), name));
                saved.push(save_field(field, &name, &dest, max_bytes).await?.path);
            }
            Some("order") => order = field.text().await?,
            _ => {}
        }
    }

    if saved.len() < 2 {
        return Err(AppError::BadRequest(
            "At least 2 PDF files are required".to_string(),
        ));
    }

    let indices = parse_order(&order, saved.len())
        .ok_or_else(|| AppError::BadRequest("Invalid order parameter".to_string()))?;
    let inputs: Vec<PathBuf> = indices.into_iter().map(|i| saved[i].clone()).collect();

    tracing::info!(job = %job.id(), files = inputs.len(), "Merging PDFs");

    let output = job.join("merged.pdf");
    let target = output.clone();
    run_blocking(move || {
        pdf::merge(&inputs, &target).map_err(|e| document_failure("Failed to merge PDFs", e))
    })
    .await?;

    file_response(&output, "merged.pdf").await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_order() {
        assert_eq!(parse_order("", 3), Some(vec![0, 1, 2]));
        assert_eq!(parse_order("  ", 2), Some(vec![0, 1]));
        assert_eq!(parse_order("2, 0,1", 3), Some(vec![2, 0, 1]));
        assert_eq!(parse_order("1,1", 2), Some(vec![1, 1]));
    }

    #[test]
    fn test_parse_order_rejects_bad_entries() {
        assert_eq!(parse_order("0,3", 3), None);
        assert_eq!(parse_order("a,b", 3), None);
        assert_eq!(parse_order("-1", 3), None);
        assert_eq!(parse_order("0,,1", 3), None);
    }
}
