//! User cleanup hook for the account service.
//!
//! DELETE /api/v1/users/{id}/follows   (admin)

use axum::{
    extract::{Extension, Path, State},
    routing::delete,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;
use voyage_common::error::VoyageResult;

use crate::{middleware::AuthContext, AppState};

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/users/{id}/follows", delete(purge_follows))
}

#[derive(Serialize)]
struct PurgeResponse {
    removed: u64,
}

/// Remove every follow of a user, keeping follower counts in step.
async fn purge_follows(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> VoyageResult<Json<PurgeResponse>> {
    auth.require_admin()?;
    let removed = state.coordinator.purge_user(user_id).await?;
    Ok(Json(PurgeResponse { removed }))
}
