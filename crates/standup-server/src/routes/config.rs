use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use standup_core::ConfigPatch;

use crate::error::AppError;
use crate::routes::actor;
use crate::state::AppState;

/// GET /api/workspaces/{workspace}/config: created with defaults on first
/// access.
pub async fn get_config(
    State(app): State<AppState>,
    Path(workspace): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let config = app.engine.config(&workspace).await?;
    Ok(Json(serde_json::to_value(&config)?))
}

/// PATCH /api/workspaces/{workspace}/config: apply a partial update.
///
/// Invalid values reject the whole patch with 400 and leave the stored
/// config untouched. When the workspace has admins, the
/// `x-standup-actor` header must name one of them.
pub async fn update_config(
    State(app): State<AppState>,
    Path(workspace): Path<String>,
    headers: HeaderMap,
    Json(patch): Json<ConfigPatch>,
) -> Result<Json<serde_json::Value>, AppError> {
    let actor = actor(&headers);
    let config = app
        .engine
        .configure(&workspace, actor, &patch, app.now())
        .await?;
    Ok(Json(serde_json::to_value(&config)?))
}
