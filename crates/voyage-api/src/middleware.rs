//! Middleware: bearer-token authentication and security headers.

use axum::{
    extract::{Request, State},
    http::{header, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use uuid::Uuid;
use voyage_common::{
    auth::{self, Role},
    error::{VoyageError, VoyageResult},
};

use crate::AppState;

/// Authentication context extracted from the Authorization header.
#[derive(Debug, Clone, Copy)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub role: Role,
}

impl AuthContext {
    /// Reject callers without the admin role.
    pub fn require_admin(&self) -> VoyageResult<()> {
        if self.role.is_admin() {
            Ok(())
        } else {
            tracing::debug!(user_id = %self.user_id, "Admin route refused");
            Err(VoyageError::Forbidden)
        }
    }
}

/// Validate the `Authorization: Bearer <token>` header and attach an
/// [`AuthContext`] to the request.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, VoyageError> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(VoyageError::Unauthorized)?;

    let claims =
        auth::validate_token(token, &state.jwt_secret).map_err(|_| VoyageError::InvalidToken)?;

    let user_id = claims
        .sub
        .parse::<Uuid>()
        .map_err(|_| VoyageError::InvalidToken)?;

    request.extensions_mut().insert(AuthContext {
        user_id,
        role: claims.role,
    });

    Ok(next.run(request).await)
}

/// Add security headers to every HTTP response.
pub async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    for (name, value) in [
        ("x-content-type-options", "nosniff"),
        ("x-frame-options", "DENY"),
        ("referrer-policy", "strict-origin-when-cross-origin"),
        ("content-security-policy", "default-src 'none'; img-src 'self'; frame-ancestors 'none'"),
    ] {
        headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
    }

    response
}
