//! The upload relay: `POST /api/upload`.
//!
//! Accepts a single-file multipart body, authenticates to Google Drive with
//! whichever credential shape is configured, optionally verifies access to
//! the target folder, and forwards the file as a new object. The uploaded
//! bytes are staged to a request-owned temporary file that is always removed
//! once the attempt concludes.

use anyhow::Context;
use axum::Json;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::AppState;
use crate::api::models::UploadResponse;
use crate::errors::{Error, Result};
use crate::storage::StorageError;

/// Multipart field carrying the PDF
pub const PDF_FIELD: &str = "pdf";

/// Object name when the client supplies none
const FALLBACK_FILE_NAME: &str = "contract_submission.pdf";

pub async fn submit_contract(State(state): State<AppState>, multipart: Multipart) -> Response {
    match handle_submission(&state, multipart).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(error) => error.into_error_response(state.config.development),
    }
}

/// JSON 405 for every non-POST method reaching `/api/upload` (OPTIONS is
/// answered by the CORS layer before routing).
pub async fn method_not_allowed() -> Response {
    Error::MethodNotAllowed.into_response()
}

async fn handle_submission(state: &AppState, mut multipart: Multipart) -> Result<UploadResponse> {
    let Some(staged) = stage_pdf_field(state, &mut multipart).await? else {
        return Err(Error::BadRequest {
            message: "No PDF file provided".to_string(),
        });
    };

    tracing::info!(
        file_name = ?staged.file_name,
        size = staged.size,
        "staged contract upload"
    );

    // The staged file is removed whichever way the attempt ends; a cleanup
    // failure is logged, never escalated.
    let _cleanup = scopeguard::guard(staged.path.clone(), |path| {
        if let Err(error) = std::fs::remove_file(&path) {
            tracing::warn!(path = %path.display(), %error, "failed to remove staged upload");
        }
    });

    let credential = state.config.drive.credential()?;

    let token = state.storage.authenticate(&credential).await.map_err(|error| Error::Authentication {
        message: error.to_string(),
    })?;

    if let Some(folder_id) = state.config.drive.folder_id.as_deref() {
        state.storage.verify_folder(&token, folder_id).await.map_err(|error| {
            tracing::error!(%error, folder_id, "cannot access the configured Drive folder");
            Error::StorageAccess {
                hint: format!(
                    "The service account cannot access the folder. Verify: 1) the folder ID is correct, \
                     2) the folder is shared with {} with Editor permissions",
                    credential.identity()
                ),
            }
        })?;
    }

    let content = tokio::fs::read(&staged.path).await.context("failed to read staged upload")?;
    let file_name = staged.file_name.unwrap_or_else(|| FALLBACK_FILE_NAME.to_string());
    let stored = state
        .storage
        .upload(&token, &file_name, Bytes::from(content), state.config.drive.folder_id.as_deref())
        .await
        .map_err(|error| match error {
            StorageError::TokenExchange(message) => Error::Authentication { message },
            other => Error::Upload { detail: other.to_string() },
        })?;

    tracing::info!(file_id = %stored.id, file_name = %stored.name, "uploaded contract PDF to Google Drive");

    Ok(UploadResponse {
        success: true,
        file_id: stored.id,
        file_name: stored.name,
        web_view_link: stored.web_view_link,
        message: "File uploaded successfully to Google Drive".to_string(),
    })
}

struct StagedUpload {
    path: PathBuf,
    file_name: Option<String>,
    size: u64,
}

/// Stream the `pdf` field to a temporary file, checking the size limit
/// incrementally so an oversized upload fails before any provider call.
/// Returns `None` when the body carries no `pdf` field.
async fn stage_pdf_field(state: &AppState, multipart: &mut Multipart) -> Result<Option<StagedUpload>> {
    let max_bytes = state.config.max_upload_bytes;

    while let Some(mut field) = multipart.next_field().await.map_err(|e| Error::BadRequest {
        message: format!("Failed to parse multipart data: {e}"),
    })? {
        if field.name() != Some(PDF_FIELD) {
            // Drain and ignore unrelated fields
            while read_chunk(&mut field).await?.is_some() {}
            continue;
        }

        let file_name = field.file_name().map(str::to_string);
        let path = std::env::temp_dir().join(format!("formrelay-{}.pdf", Uuid::new_v4()));
        // Remove the partial file if staging bails early; defused on success
        let cleanup = scopeguard::guard(path.clone(), |path| {
            let _ = std::fs::remove_file(path);
        });

        let mut file = tokio::fs::File::create(&path).await.context("failed to create staging file")?;
        let mut total: u64 = 0;
        while let Some(chunk) = read_chunk(&mut field).await? {
            total += chunk.len() as u64;
            if total > max_bytes {
                tracing::warn!(total, max_bytes, "upload exceeds size limit, aborting");
                return Err(Error::PayloadTooLarge {
                    message: format!(
                        "File size exceeds maximum allowed size of {} bytes ({} MB)",
                        max_bytes,
                        max_bytes / (1024 * 1024)
                    ),
                });
            }
            file.write_all(&chunk).await.context("failed to write staging file")?;
        }
        file.flush().await.context("failed to flush staging file")?;

        let path = scopeguard::ScopeGuard::into_inner(cleanup);
        return Ok(Some(StagedUpload {
            path,
            file_name,
            size: total,
        }));
    }

    Ok(None)
}

async fn read_chunk(field: &mut axum::extract::multipart::Field<'_>) -> Result<Option<Bytes>> {
    field.chunk().await.map_err(|e| Error::BadRequest {
        message: format!("Failed to read upload chunk: {e}"),
    })
}
