use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use standup_core::error::StandupError;

/// Sentinel carrying an explicit 404 through the `anyhow::Error` chain.
#[derive(Debug)]
struct NotFoundError(String);

impl std::fmt::Display for NotFoundError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for NotFoundError {}

// ---------------------------------------------------------------------------
// AppError: unified error type for HTTP responses
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self(NotFoundError(msg.into()).into())
    }

    pub fn join(e: tokio::task::JoinError) -> Self {
        Self(anyhow::anyhow!("task join error: {e}"))
    }
}

fn status_for(e: &StandupError) -> StatusCode {
    match e {
        StandupError::InvalidTimezone(_)
        | StandupError::InvalidTriggerTime(_)
        | StandupError::InvalidLookback(_)
        | StandupError::InvalidDate(_)
        | StandupError::InvalidId(_)
        | StandupError::Json(_) => StatusCode::BAD_REQUEST,
        StandupError::NotAuthorized(_) => StatusCode::FORBIDDEN,
        StandupError::NoChannel(_) => StatusCode::CONFLICT,
        StandupError::Transport(_) => StatusCode::BAD_GATEWAY,
        StandupError::NotInitialized
        | StandupError::Store(_)
        | StandupError::Io(_)
        | StandupError::Yaml(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Some(n) = self.0.downcast_ref::<NotFoundError>() {
            let body = serde_json::json!({ "error": n.0.clone() });
            return (StatusCode::NOT_FOUND, axum::Json(body)).into_response();
        }

        let status = self
            .0
            .downcast_ref::<StandupError>()
            .map(status_for)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }

        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use standup_core::transport::TransportError;

    fn status(e: StandupError) -> StatusCode {
        AppError(e.into()).into_response().status()
    }

    #[test]
    fn config_errors_map_to_400() {
        assert_eq!(status(StandupError::InvalidTimezone("X".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status(StandupError::InvalidTriggerTime("25:00".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status(StandupError::InvalidLookback(25)), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn not_authorized_maps_to_403() {
        assert_eq!(status(StandupError::NotAuthorized("u".into())), StatusCode::FORBIDDEN);
    }

    #[test]
    fn no_channel_maps_to_409() {
        assert_eq!(status(StandupError::NoChannel("g".into())), StatusCode::CONFLICT);
    }

    #[test]
    fn transport_maps_to_502() {
        let e = StandupError::Transport(TransportError::Request("timeout".into()));
        assert_eq!(status(e), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn store_and_foreign_errors_map_to_500() {
        assert_eq!(status(StandupError::Store("x".into())), StatusCode::INTERNAL_SERVER_ERROR);
        let foreign = AppError(anyhow::anyhow!("boom")).into_response();
        assert_eq!(foreign.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn not_found_constructor_maps_to_404() {
        let response = AppError::not_found("no session").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
