//! Donation listing endpoints

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use alms_core::models::Donation;

use crate::{AppError, AppState};

use super::Pagination;

#[derive(Debug, Deserialize)]
pub struct DonationQuery {
    pub donor_id: Option<i64>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Serialize)]
pub struct DonationListResponse {
    pub donations: Vec<Donation>,
    pub total: i64,
}

/// GET /api/donations - List donations, optionally scoped to one donor
pub async fn list_donations(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DonationQuery>,
) -> Result<Json<DonationListResponse>, AppError> {
    let pagination = Pagination {
        limit: query.limit,
        offset: query.offset,
    };
    let (limit, offset) = pagination.resolve();

    let donations = state.db.list_donations(query.donor_id, limit, offset)?;
    let total = state.db.count_donations()?;

    Ok(Json(DonationListResponse { donations, total }))
}

/// GET /api/donations/attention - Donations awaiting human review
pub async fn list_flagged_donations(
    State(state): State<Arc<AppState>>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<DonationListResponse>, AppError> {
    let (limit, offset) = pagination.resolve();

    let donations = state.db.list_flagged_donations(limit, offset)?;
    let total = state.db.count_flagged_donations()?;

    Ok(Json(DonationListResponse { donations, total }))
}
