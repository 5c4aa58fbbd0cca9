//! CSV import endpoint

use std::io::Write;
use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Serialize;
use tracing::{info, warn};

use alms_core::db::Database;
use alms_core::import::{ImportConfig, ImportResult, Importer, RowError};
use alms_core::Error as CoreError;

use crate::{AppError, AppState, MAX_UPLOAD_SIZE};

/// Import response, one count per outcome bucket
#[derive(Serialize)]
pub struct ImportResponse {
    pub success_count: usize,
    pub skipped_count: usize,
    pub failed_count: usize,
    pub needs_attention_count: usize,
    pub errors: Vec<RowError>,
}

impl From<ImportResult> for ImportResponse {
    fn from(result: ImportResult) -> Self {
        Self {
            success_count: result.succeeded_count(),
            skipped_count: result.skipped_count(),
            failed_count: result.failed_count(),
            needs_attention_count: result.needs_attention_count(),
            errors: result.failed,
        }
    }
}

/// POST /api/import - Import a Stripe payments CSV
///
/// Multipart form fields:
/// - file: CSV file data (required)
/// - dup_window_days: grace window override for duplicate-subscription
///   detection (optional)
///
/// Row-level problems land in `errors` with a 200 status; only
/// unreadable or structurally invalid files are rejected outright.
pub async fn import_csv(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<ImportResponse>, AppError> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut config = state.config.import.clone();

    // Extract fields from multipart form
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(&format!("Failed to read form field: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|_| AppError::bad_request("Failed to read file data"))?;

                if bytes.len() > MAX_UPLOAD_SIZE {
                    return Err(AppError::bad_request(&format!(
                        "File too large. Maximum size is {} MB",
                        MAX_UPLOAD_SIZE / 1024 / 1024
                    )));
                }

                file_data = Some(bytes.to_vec());
            }
            "dup_window_days" => {
                let value = field
                    .text()
                    .await
                    .map_err(|_| AppError::bad_request("Failed to read dup_window_days"))?;
                config.dup_window_days = value.parse().map_err(|_| {
                    AppError::bad_request(&format!("Invalid dup_window_days: {}", value))
                })?;
            }
            _ => {
                warn!(field = %name, "Ignoring unknown form field");
            }
        }
    }

    let file_data = file_data.ok_or_else(|| AppError::bad_request("No file provided"))?;

    let result = import_csv_core(&state.db, &config, &file_data)?;

    info!(
        succeeded = result.succeeded_count(),
        skipped = result.skipped_count(),
        failed = result.failed_count(),
        needs_attention = result.needs_attention_count(),
        "CSV import complete"
    );

    Ok(Json(result.into()))
}

/// Stage the upload to a temp file and run the importer
///
/// Uploads are written to disk verbatim so the CSV reader sees exactly
/// the bytes the client sent.
pub fn import_csv_core(
    db: &Database,
    config: &ImportConfig,
    data: &[u8],
) -> Result<ImportResult, AppError> {
    let mut staged = tempfile::NamedTempFile::new()
        .map_err(|e| AppError::internal(&format!("Failed to stage upload: {}", e)))?;
    staged
        .write_all(data)
        .map_err(|e| AppError::internal(&format!("Failed to stage upload: {}", e)))?;
    staged
        .flush()
        .map_err(|e| AppError::internal(&format!("Failed to stage upload: {}", e)))?;

    let importer = Importer::with_config(db, db, config.clone());
    importer.import(staged.path()).map_err(|e| match e {
        // A malformed header is the client's problem, not ours
        CoreError::Parse(msg) => AppError::bad_request(&msg),
        other => AppError::from(other),
    })
}
