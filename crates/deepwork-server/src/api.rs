//! Session routes.
//!
//! Request bodies are checked for shape here. Field rules and everything
//! about state are left to the core.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use deepwork_core::service::DEFAULT_PAGE_SIZE;
use deepwork_core::session::require_text;
use deepwork_core::{CoreError, NewSession, Session, SessionHistory};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub const API_PREFIX: &str = "/api/v1";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    pub title: String,
    pub goal: String,
    pub scheduled_duration: f64,
}

impl From<CreateSessionRequest> for NewSession {
    fn from(req: CreateSessionRequest) -> Self {
        NewSession::new(req.title, req.goal, req.scheduled_duration)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PauseRequest {
    pub reason: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub skip: Option<usize>,
    pub limit: Option<usize>,
}

pub fn routes() -> Router<AppState> {
    let sessions = format!("{API_PREFIX}/sessions");
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route(&sessions, post(create_session).get(list_sessions))
        .route(&format!("{sessions}/"), post(create_session).get(list_sessions))
        .route(&format!("{sessions}/history"), get(session_history))
        .route(&format!("{sessions}/:id"), get(get_session).delete(delete_session))
        .route(&format!("{sessions}/:id/start"), patch(start_session))
        .route(&format!("{sessions}/:id/pause"), patch(pause_session))
        .route(&format!("{sessions}/:id/resume"), patch(resume_session))
        .route(&format!("{sessions}/:id/complete"), patch(complete_session))
}

async fn root() -> Json<Value> {
    Json(json!({
        "message": "Deep Work Session Tracker API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::InvalidRequest(rejection.body_text()))
}

fn session_id(path: Result<Path<i64>, PathRejection>) -> ApiResult<i64> {
    path.map(|Path(id)| id)
        .map_err(|rejection| ApiError::InvalidRequest(rejection.body_text()))
}

async fn create_session(
    State(state): State<AppState>,
    payload: Result<Json<CreateSessionRequest>, JsonRejection>,
) -> ApiResult<Json<Session>> {
    let request = body(payload)?;
    let session = state.service.lock().await.create(request.into())?;
    Ok(Json(session))
}

async fn list_sessions(
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> ApiResult<Json<Vec<Session>>> {
    let Query(params) = params.map_err(|rejection| ApiError::InvalidRequest(rejection.body_text()))?;
    let sessions = state.service.lock().await.list(
        params.skip.unwrap_or(0),
        params.limit.unwrap_or(DEFAULT_PAGE_SIZE),
    )?;
    Ok(Json(sessions))
}

async fn session_history(State(state): State<AppState>) -> ApiResult<Json<SessionHistory>> {
    Ok(Json(state.service.lock().await.history()?))
}

async fn get_session(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Session>> {
    let id = session_id(path)?;
    Ok(Json(state.service.lock().await.get(id)?))
}

async fn delete_session(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<StatusCode> {
    let id = session_id(path)?;
    state.service.lock().await.delete(id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn start_session(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Session>> {
    let id = session_id(path)?;
    Ok(Json(state.service.lock().await.start(id)?))
}

async fn pause_session(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<PauseRequest>, JsonRejection>,
) -> ApiResult<Json<Session>> {
    let id = session_id(path)?;
    let request = body(payload)?;
    // Checked before the state so a blank reason is always a 422.
    require_text("reason", &request.reason).map_err(CoreError::from)?;
    Ok(Json(state.service.lock().await.pause(id, &request.reason)?))
}

async fn resume_session(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Session>> {
    let id = session_id(path)?;
    Ok(Json(state.service.lock().await.resume(id)?))
}

async fn complete_session(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Session>> {
    let id = session_id(path)?;
    Ok(Json(state.service.lock().await.complete(id)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use deepwork_core::ValidationError;

    #[test]
    fn create_request_uses_core_field_rules() {
        let request: CreateSessionRequest = serde_json::from_value(json!({
            "title": "   ",
            "goal": "g",
            "scheduled_duration": 25.0
        }))
        .unwrap();
        let input = NewSession::from(request);
        assert_eq!(input.validate(), Err(ValidationError::EmptyField { field: "title" }));
    }

    #[test]
    fn blank_reason_is_unprocessable() {
        let err = ApiError::from(CoreError::from(require_text("reason", " ").unwrap_err()));
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
