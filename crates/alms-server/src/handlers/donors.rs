//! Donor management endpoints

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use alms_core::models::Donor;
use alms_core::Error as CoreError;

use crate::{AppError, AppState, SuccessResponse};

use super::Pagination;

#[derive(Serialize)]
pub struct DonorListResponse {
    pub donors: Vec<Donor>,
    pub total: i64,
}

/// GET /api/donors - List donors
pub async fn list_donors(
    State(state): State<Arc<AppState>>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<DonorListResponse>, AppError> {
    let (limit, offset) = pagination.resolve();

    let donors = state.db.list_donors(limit, offset)?;
    let total = state.db.count_donors()?;

    Ok(Json(DonorListResponse { donors, total }))
}

#[derive(Deserialize)]
pub struct MergeRequest {
    pub target_id: i64,
}

#[derive(Serialize)]
pub struct MergeResponse {
    /// The donor all records now point at
    pub canonical_id: i64,
}

/// POST /api/donors/:id/merge - Merge donor :id into another donor
///
/// The path id is the source; the body names the surviving target.
pub async fn merge_donor(
    State(state): State<Arc<AppState>>,
    Path(source_id): Path<i64>,
    Json(request): Json<MergeRequest>,
) -> Result<Json<MergeResponse>, AppError> {
    let canonical_id = state
        .db
        .merge_donors(source_id, request.target_id)
        .map_err(map_donor_error)?;

    info!(source_id, canonical_id, "Merged donor");

    Ok(Json(MergeResponse { canonical_id }))
}

/// POST /api/donors/:id/discard - Soft-discard a donor
pub async fn discard_donor(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.db.discard_donor(id).map_err(map_donor_error)?;

    info!(id, "Discarded donor");

    Ok(Json(SuccessResponse { success: true }))
}

fn map_donor_error(err: CoreError) -> AppError {
    match err {
        CoreError::NotFound(msg) => AppError::not_found(&msg),
        CoreError::InvalidData(msg) => AppError::bad_request(&msg),
        other => AppError::from(other),
    }
}
