// Identity middleware for the threat monitor routes
// Resolves the caller and injects AuthenticatedUser into request extensions

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{request::Parts, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{app::AppState, middleware::auth::AuthenticatedUser, utils::ThreatMonitorError};

/// Reject with 401 unless the request carries a valid identity
pub async fn require_identity(
    State(app_state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    match app_state.identity.resolve(request.headers()) {
        Ok(user) => {
            tracing::debug!(user_id = %user.user_id, "Caller identity resolved");
            request.extensions_mut().insert(user);
            next.run(request).await
        },
        Err(e) => {
            tracing::info!(reason = %e, path = %request.uri().path(), "Unauthenticated threat monitor request");
            ThreatMonitorError::Unauthenticated.into_response()
        },
    }
}

/// Extractor for AuthenticatedUser placed by `require_identity`
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = ThreatMonitorError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or(ThreatMonitorError::Unauthenticated)
    }
}
