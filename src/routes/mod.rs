use axum::{Router, extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::{error::AppError, state::SharedState};

pub mod actions;
pub mod docs;
pub mod duels;
pub mod health;
pub mod maintenance;

/// Header carrying the authenticated user id, set by the upstream gateway.
pub const USER_ID_HEADER: &str = "x-user-id";
/// Header carrying the caller's subscription tier.
pub const TIER_HEADER: &str = "x-subscription-tier";

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(duels::router())
        .merge(actions::router())
        .merge(maintenance::router());

    let docs_router = docs::router(state.clone());

    api_router.merge(docs_router).with_state(state)
}

/// Identity forwarded by the gateway in front of this service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: Uuid,
    /// Empty when the gateway sent no tier.
    pub tier: String,
}

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| AppError::Unauthorized(format!("missing `{USER_ID_HEADER}` header")))?;
        let user_id = raw
            .to_str()
            .ok()
            .and_then(|value| Uuid::parse_str(value.trim()).ok())
            .ok_or_else(|| AppError::Unauthorized(format!("invalid `{USER_ID_HEADER}` header")))?;
        let tier = parts
            .headers
            .get(TIER_HEADER)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_owned();

        Ok(Self { user_id, tier })
    }
}
