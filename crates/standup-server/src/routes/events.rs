use axum::extract::{Path, State};
use axum::Json;
use standup_core::tracker::{IgnoreReason, TrackOutcome};
use standup_core::InboundEvent;

use crate::error::AppError;
use crate::state::AppState;

fn reason_label(reason: IgnoreReason) -> &'static str {
    match reason {
        IgnoreReason::OtherChannel => "other_channel",
        IgnoreReason::Excluded => "excluded",
        IgnoreReason::NoSession => "no_session",
        IgnoreReason::OutsideWindow => "outside_window",
        IgnoreReason::NotSourceEvent => "not_source_event",
        IgnoreReason::Stale => "stale",
    }
}

fn outcome_json(outcome: TrackOutcome) -> serde_json::Value {
    match outcome {
        TrackOutcome::Recorded => serde_json::json!({ "outcome": "recorded" }),
        TrackOutcome::Retracted => serde_json::json!({ "outcome": "retracted" }),
        TrackOutcome::Buffered => serde_json::json!({ "outcome": "buffered" }),
        TrackOutcome::Unchanged => serde_json::json!({ "outcome": "unchanged" }),
        TrackOutcome::Ignored(reason) => {
            serde_json::json!({ "outcome": "ignored", "reason": reason_label(reason) })
        }
    }
}

/// POST /api/workspaces/{workspace}/events: deliver one message
/// create/edit/delete from the chat platform.
///
/// Out-of-window and excluded-member events are not errors; the response
/// says what happened to the event.
pub async fn post_event(
    State(app): State<AppState>,
    Path(workspace): Path<String>,
    Json(event): Json<InboundEvent>,
) -> Result<Json<serde_json::Value>, AppError> {
    let outcome = app
        .engine
        .deliver_event(&workspace, &event, app.now())
        .await?;
    Ok(Json(outcome_json(outcome)))
}
