//! Document upload handler

use super::Status;
use crate::AppState;
use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Json,
};
use docqa_common::errors::{AppError, Result};
use serde::Serialize;

/// Multipart field carrying the uploaded file
const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub status: Status,
    pub message: String,
    pub document_id: String,
    pub document_name: String,
    pub passages: usize,
}

/// POST /api/embedding - parse, chunk, and index one document
pub async fn upload_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    let limit = state.config.server.max_upload_bytes;
    let to_app_error = |e: MultipartError| multipart_error(e, limit);

    while let Some(field) = multipart.next_field().await.map_err(to_app_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let document_name = field
            .file_name()
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .ok_or_else(|| AppError::Validation {
                message: "Uploaded file has no file name".to_string(),
                field: Some(FILE_FIELD.to_string()),
            })?;
        let bytes = field.bytes().await.map_err(to_app_error)?;

        tracing::info!(document_name = %document_name, size = bytes.len(), "Document uploaded");

        let receipt = state
            .engine
            .ingestor()
            .ingest(&document_name, bytes.to_vec())
            .await?;

        return Ok(Json(UploadResponse {
            status: Status::Success,
            message: "Document embedded successfully.".to_string(),
            document_id: receipt.document_id,
            document_name: receipt.document_name,
            passages: receipt.passages,
        }));
    }

    Err(AppError::MissingField {
        field: FILE_FIELD.to_string(),
    })
}

/// The body limit surfaces as a multipart error while the stream is read
fn multipart_error(e: MultipartError, limit: usize) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return AppError::PayloadTooLarge { limit };
    }
    AppError::Validation {
        message: format!("Invalid multipart body: {}", e.body_text()),
        field: None,
    }
}
