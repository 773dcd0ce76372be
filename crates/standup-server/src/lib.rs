pub mod error;
pub mod routes;
pub mod state;
pub mod webhook;

use std::path::Path;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use standup_core::{Engine, Settings, StandupDb};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::webhook::WebhookTransport;

/// Build the axum Router with all API routes and middleware.
/// Used by `serve()` and available for integration testing.
pub fn build_router(app_state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(routes::health::health))
        // Inbound chat events
        .route(
            "/api/workspaces/{workspace}/events",
            post(routes::events::post_event),
        )
        // Sessions
        .route(
            "/api/workspaces/{workspace}/open",
            post(routes::sessions::open_session),
        )
        .route(
            "/api/workspaces/{workspace}/refresh",
            post(routes::sessions::refresh_session),
        )
        .route(
            "/api/workspaces/{workspace}/summary",
            get(routes::sessions::get_summary),
        )
        // Config
        .route(
            "/api/workspaces/{workspace}/config",
            get(routes::config::get_config).patch(routes::config::update_config),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

/// Open the database, start the tick loop and serve the HTTP API on the
/// configured listen address until the process exits.
pub async fn serve(root: &Path, settings: Settings) -> anyhow::Result<()> {
    let db_path = settings.database_path(root);
    let store = Arc::new(StandupDb::open(&db_path)?);
    let transport = Arc::new(WebhookTransport::new()?);
    let engine = Arc::new(Engine::from_settings(store, transport, &settings));

    tokio::spawn(Arc::clone(&engine).run());

    let listener = tokio::net::TcpListener::bind(&settings.listen).await?;
    tracing::info!(
        addr = %listener.local_addr()?,
        database = %db_path.display(),
        "standup server listening"
    );

    axum::serve(listener, build_router(AppState::new(engine))).await?;
    Ok(())
}
