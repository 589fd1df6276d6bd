//! Follow routes for the authenticated user.
//!
//! POST   /api/v1/vacations/{id}/follow
//! DELETE /api/v1/vacations/{id}/follow
//! GET    /api/v1/vacations/{id}/follow

use axum::{
    extract::{Extension, Path, State},
    routing::post,
    Json, Router,
};
use std::sync::Arc;
use uuid::Uuid;
use voyage_common::{error::VoyageResult, models::FollowState};

use crate::{middleware::AuthContext, AppState};

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route(
        "/vacations/{id}/follow",
        post(follow).delete(unfollow).get(follow_status),
    )
}

async fn follow(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Path(vacation_id): Path<Uuid>,
) -> VoyageResult<Json<FollowState>> {
    Ok(Json(state.coordinator.follow(auth.user_id, vacation_id).await?))
}

async fn unfollow(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Path(vacation_id): Path<Uuid>,
) -> VoyageResult<Json<FollowState>> {
    Ok(Json(state.coordinator.unfollow(auth.user_id, vacation_id).await?))
}

async fn follow_status(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Path(vacation_id): Path<Uuid>,
) -> VoyageResult<Json<FollowState>> {
    Ok(Json(state.coordinator.status(auth.user_id, vacation_id).await?))
}
