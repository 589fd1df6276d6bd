//! Admin follower statistics.
//!
//! GET /api/v1/stats/destinations       (JSON)
//! GET /api/v1/stats/destinations.csv   (CSV export)

use axum::{
    extract::{Extension, State},
    http::header,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use voyage_common::{error::VoyageResult, models::DestinationStat};

use crate::{middleware::AuthContext, AppState};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/stats/destinations", get(destination_stats))
        .route("/stats/destinations.csv", get(destination_stats_csv))
}

async fn destination_stats(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
) -> VoyageResult<Json<Vec<DestinationStat>>> {
    auth.require_admin()?;
    Ok(Json(state.listing.stats_by_destination().await?))
}

async fn destination_stats_csv(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
) -> VoyageResult<impl IntoResponse> {
    auth.require_admin()?;
    let body = state.listing.stats_csv().await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"destinations.csv\"",
            ),
        ],
        body,
    ))
}
