pub mod config;
pub mod events;
pub mod health;
pub mod sessions;

use axum::http::HeaderMap;
use standup_core::Actor;

/// Header naming the chat member on whose behalf an admin request is made.
/// Requests without it are anonymous and rejected once a workspace has admins.
pub const ACTOR_HEADER: &str = "x-standup-actor";

pub(crate) fn actor(headers: &HeaderMap) -> Actor<'_> {
    headers
        .get(ACTOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map_or(Actor::Anonymous, Actor::Member)
}
