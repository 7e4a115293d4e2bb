//! Shared-secret bearer check for the HTTP surface.
//!
//! Runs as middleware in front of every route, so a rejected request never
//! reaches the accept endpoint and never creates a session.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Json, Router,
};
use std::sync::Arc;
use tracing::warn;

/// The configured secret. Requests must send `Authorization: Bearer <secret>`.
#[derive(Clone)]
pub struct BearerToken(Arc<str>);

impl BearerToken {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(Arc::from(secret.into()))
    }

    /// Compare without short-circuiting on the first differing byte.
    fn matches(&self, presented: &str) -> bool {
        let expected = self.0.as_bytes();
        let presented = presented.as_bytes();
        if expected.len() != presented.len() {
            return false;
        }
        expected
            .iter()
            .zip(presented)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BearerToken(***)")
    }
}

/// Middleware: pass the request on only if it carries the right bearer token.
pub async fn require_bearer(
    State(token): State<BearerToken>,
    request: Request,
    next: Next,
) -> Response {
    let authorized = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|presented| token.matches(presented));

    if authorized {
        return next.run(request).await;
    }

    warn!(path = %request.uri().path(), "rejected unauthorized request");
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({ "ok": false, "error": "unauthorized" })),
    )
        .into_response()
}

/// Guard every route of `router` when a token is configured.
pub fn with_bearer_auth(router: Router, token: Option<BearerToken>) -> Router {
    match token {
        Some(token) => router.layer(middleware::from_fn_with_state(token, require_bearer)),
        None => router,
    }
}
