//! Public intake endpoint.

use axum::{extract::State, Json};

use super::{error, revision, success, ApiResult};
use crate::models::{SubmitRequest, SubmitResponse};
use crate::AppState;

/// POST /api/submissions - Submit the "hire me" form.
pub async fn create_submission(
    State(state): State<AppState>,
    Json(request): Json<SubmitRequest>,
) -> ApiResult<SubmitResponse> {
    match state.intake.submit(&request).await {
        Ok(id) => success(SubmitResponse { id }, revision(&state).await),
        Err(e) => error(e.into(), revision(&state).await),
    }
}
