//! Serves stored vacation images.
//!
//! GET /api/v1/images/{*ref}

use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    routing::get,
    Router,
};
use std::sync::Arc;
use voyage_common::error::{VoyageError, VoyageResult};

use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/images/{*image_ref}", get(serve_image))
}

async fn serve_image(
    State(state): State<Arc<AppState>>,
    Path(image_ref): Path<String>,
) -> VoyageResult<impl IntoResponse> {
    let (bytes, content_type) = state
        .images()
        .read(&image_ref)
        .await?
        .ok_or_else(|| VoyageError::not_found("Image"))?;

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, "public, max-age=86400".to_string()),
        ],
        bytes,
    ))
}
