use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use standup_core::SummaryDocument;

use crate::error::AppError;
use crate::routes::actor;
use crate::state::AppState;

fn document_json(document: &SummaryDocument) -> serde_json::Value {
    serde_json::json!({
        "document": document,
        "markdown": document.to_markdown(),
    })
}

/// POST /api/workspaces/{workspace}/open: force a session open now.
///
/// Bypasses the trigger time and the workday calendar and supersedes a
/// session already open today.
pub async fn open_session(
    State(app): State<AppState>,
    Path(workspace): Path<String>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    let actor = actor(&headers);
    let session = app
        .engine
        .open_now(&workspace, actor, app.now())
        .await?;
    Ok(Json(serde_json::json!({
        "session_id": session.id(),
        "opened_at": session.opened_at,
        "deadline_at": session.deadline_at,
        "local_date": session.local_date,
        "summary_display_ref": session.summary_display_ref,
        "participants": session.participation.len(),
    })))
}

/// POST /api/workspaces/{workspace}/refresh: push the current summary into
/// its display again, replacing it if it was deleted.
pub async fn refresh_session(
    State(app): State<AppState>,
    Path(workspace): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    match app.engine.refresh(&workspace, app.now()).await? {
        Some(document) => Ok(Json(document_json(&document))),
        None => Err(AppError::not_found(format!(
            "no session opened yet for workspace {workspace}"
        ))),
    }
}

/// GET /api/workspaces/{workspace}/summary: render without touching the
/// display.
pub async fn get_summary(
    State(app): State<AppState>,
    Path(workspace): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    match app.engine.summary(&workspace, app.now()).await? {
        Some(document) => Ok(Json(document_json(&document))),
        None => Err(AppError::not_found(format!(
            "no session opened yet for workspace {workspace}"
        ))),
    }
}
