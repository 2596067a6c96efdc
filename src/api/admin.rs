//! Admin endpoints: sign-in, roster and moderation.

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Extension, Json,
};
use serde::Deserialize;

use super::{error, revision, success, ApiResult};
use crate::auth::{extract_token, SessionToken};
use crate::models::{
    DeleteResponse, LoginRequest, LoginResponse, RosterSnapshot, SessionStatus,
};
use crate::roster::DeleteOutcome;
use crate::AppState;

/// Operator confirmation passed as `?confirm=true`.
#[derive(Debug, Default, Deserialize)]
pub struct ConfirmQuery {
    #[serde(default)]
    pub confirm: bool,
}

impl From<DeleteOutcome> for DeleteResponse {
    fn from(outcome: DeleteOutcome) -> Self {
        match outcome {
            DeleteOutcome::Declined => DeleteResponse {
                confirmed: false,
                deleted: 0,
            },
            DeleteOutcome::Deleted(deleted) => DeleteResponse {
                confirmed: true,
                deleted,
            },
        }
    }
}

/// POST /api/admin/login - Sign in as the admin.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let revision_id = revision(&state).await;

    match state
        .sessions
        .sign_in(&state.admin, &request.email, &request.password)
        .await
    {
        Ok(token) => success(LoginResponse { token }, revision_id),
        Err(e) => error(e.into(), revision_id),
    }
}

/// POST /api/admin/logout - End the session and close its roster.
pub async fn logout(
    State(state): State<AppState>,
    Extension(SessionToken(token)): Extension<SessionToken>,
) -> ApiResult<SessionStatus> {
    state.sessions.sign_out(&token).await;
    success(
        SessionStatus {
            authenticated: false,
        },
        revision(&state).await,
    )
}

/// GET /api/admin/session - Whether the caller holds a live session.
pub async fn session_status(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<SessionStatus> {
    let authenticated = match extract_token(&headers) {
        Some(token) => state.sessions.is_authenticated(&token).await,
        None => false,
    };
    success(SessionStatus { authenticated }, revision(&state).await)
}

/// GET /api/admin/roster - Open the roster if needed and return its current view.
pub async fn get_roster(
    State(state): State<AppState>,
    Extension(SessionToken(token)): Extension<SessionToken>,
) -> ApiResult<RosterSnapshot> {
    let revision_id = revision(&state).await;

    match state.sessions.roster(&token).await {
        Ok(view) => success(view.snapshot().await, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/admin/roster - Close the roster.
pub async fn close_roster(
    State(state): State<AppState>,
    Extension(SessionToken(token)): Extension<SessionToken>,
) -> ApiResult<()> {
    let revision_id = revision(&state).await;

    match state.sessions.close_roster(&token).await {
        Ok(()) => success((), revision_id),
        Err(e) => error(e.into(), revision_id),
    }
}

/// DELETE /api/admin/submissions/:id - Delete one submission.
pub async fn delete_submission(
    State(state): State<AppState>,
    Extension(SessionToken(token)): Extension<SessionToken>,
    Path(id): Path<String>,
    Query(query): Query<ConfirmQuery>,
) -> ApiResult<DeleteResponse> {
    let revision_id = revision(&state).await;

    let view = match state.sessions.roster(&token).await {
        Ok(view) => view,
        Err(e) => return error(e, revision_id),
    };

    match view.delete_one(&id, &query.confirm).await {
        Ok(outcome) => success(outcome.into(), revision(&state).await),
        Err(e) => error(e.into(), revision_id),
    }
}

/// DELETE /api/admin/submissions - Delete every submission.
pub async fn delete_all_submissions(
    State(state): State<AppState>,
    Extension(SessionToken(token)): Extension<SessionToken>,
    Query(query): Query<ConfirmQuery>,
) -> ApiResult<DeleteResponse> {
    let revision_id = revision(&state).await;

    let view = match state.sessions.roster(&token).await {
        Ok(view) => view,
        Err(e) => return error(e, revision_id),
    };

    match view.delete_all(&query.confirm).await {
        Ok(outcome) => success(outcome.into(), revision(&state).await),
        Err(e) => error(e.into(), revision(&state).await),
    }
}
