//! Vacation routes: listing for everyone, mutations for admins.
//!
//! GET    /api/v1/vacations        (paginated, filtered)
//! POST   /api/v1/vacations        (admin, multipart)
//! GET    /api/v1/vacations/{id}
//! PUT    /api/v1/vacations/{id}   (admin, multipart)
//! DELETE /api/v1/vacations/{id}   (admin)

use axum::{
    extract::{multipart::MultipartError, Extension, Multipart, Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use voyage_common::{
    error::{VoyageError, VoyageResult},
    models::{ListFilters, NewVacation, Page, Vacation, VacationChanges, VacationListing},
};
use voyage_db::{catalog::ImageUpload, images::ImageAssetManager};

use crate::{middleware::AuthContext, AppState, MAX_IMAGES_PER_REQUEST};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/vacations", get(list_vacations).post(create_vacation))
        .route(
            "/vacations/{id}",
            get(get_vacation).put(update_vacation).delete(delete_vacation),
        )
}

// ============================================================
// Request / response types
// ============================================================

#[derive(Debug, Deserialize)]
struct ListQuery {
    page: Option<u32>,
    limit: Option<u32>,
    #[serde(default)]
    followed: bool,
    #[serde(default)]
    active: bool,
    #[serde(default)]
    upcoming: bool,
}

/// A vacation with client-facing image URLs.
#[derive(Serialize)]
pub struct VacationView {
    #[serde(flatten)]
    pub vacation: Vacation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_following: Option<bool>,
    pub image_urls: Vec<String>,
}

impl VacationView {
    fn new(vacation: Vacation, is_following: Option<bool>, images: &ImageAssetManager) -> Self {
        let image_urls = vacation.image_refs.iter().map(|r| images.url_for(r)).collect();
        Self {
            vacation,
            is_following,
            image_urls,
        }
    }

    fn from_listing(listing: VacationListing, images: &ImageAssetManager) -> Self {
        Self::new(listing.vacation, Some(listing.is_following), images)
    }
}

/// Parsed multipart body: a JSON `data` part, `image` files, and an
/// optional `append` flag.
struct VacationForm<T> {
    data: Option<T>,
    uploads: Vec<ImageUpload>,
    append: bool,
}

fn multipart_error(e: MultipartError, max_body: usize) -> VoyageError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        // The exact size is unknown once the body limit has tripped.
        return VoyageError::PayloadTooLarge {
            size: max_body.saturating_add(1),
            max: max_body,
        };
    }
    VoyageError::Validation {
        message: format!("Multipart error: {}", e.body_text()),
    }
}

async fn read_form<T: DeserializeOwned>(
    mut multipart: Multipart,
    max_body: usize,
) -> VoyageResult<VacationForm<T>> {
    let mut form = VacationForm {
        data: None,
        uploads: Vec::new(),
        append: false,
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_body))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("data") => {
                let text = field.text().await.map_err(|e| multipart_error(e, max_body))?;
                let data = serde_json::from_str(&text).map_err(|e| VoyageError::Validation {
                    message: format!("Invalid vacation data: {e}"),
                })?;
                form.data = Some(data);
            }
            Some("image") => {
                if form.uploads.len() == MAX_IMAGES_PER_REQUEST {
                    return Err(VoyageError::Validation {
                        message: format!("At most {MAX_IMAGES_PER_REQUEST} images per request"),
                    });
                }
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await.map_err(|e| multipart_error(e, max_body))?;
                form.uploads.push(ImageUpload {
                    bytes: bytes.to_vec(),
                    content_type,
                });
            }
            Some("append") => {
                let text = field.text().await.map_err(|e| multipart_error(e, max_body))?;
                form.append = text.trim().eq_ignore_ascii_case("true");
            }
            _ => {}
        }
    }

    Ok(form)
}

// ============================================================
// GET /vacations
// ============================================================

async fn list_vacations(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> VoyageResult<Json<Page<VacationView>>> {
    let request = state.listing.page_request(query.page, query.limit)?;
    let filters = ListFilters {
        followed_only: query.followed,
        active_only: query.active,
        upcoming_only: query.upcoming,
    };

    let page = state.listing.list(auth.user_id, request, filters).await?;
    let images = state.images();
    Ok(Json(page.map(|l| VacationView::from_listing(l, images))))
}

// ============================================================
// GET /vacations/{id}
// ============================================================

async fn get_vacation(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> VoyageResult<Json<VacationView>> {
    let vacation = state.catalog.get(id).await?;
    let is_following = state.coordinator.status(auth.user_id, id).await?.is_following;
    Ok(Json(VacationView::new(vacation, Some(is_following), state.images())))
}

// ============================================================
// POST /vacations
// ============================================================

async fn create_vacation(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> VoyageResult<(StatusCode, Json<VacationView>)> {
    auth.require_admin()?;

    let form = read_form::<NewVacation>(multipart, state.max_body_bytes()).await?;
    let fields = form.data.ok_or_else(|| VoyageError::Validation {
        message: "Missing `data` field".into(),
    })?;

    let vacation = state.catalog.create_with_uploads(fields, form.uploads).await?;
    Ok((
        StatusCode::CREATED,
        Json(VacationView::new(vacation, None, state.images())),
    ))
}

// ============================================================
// PUT /vacations/{id}
// ============================================================

async fn update_vacation(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> VoyageResult<Json<VacationView>> {
    auth.require_admin()?;

    let form = read_form::<VacationChanges>(multipart, state.max_body_bytes()).await?;
    let vacation = state
        .catalog
        .update_with_uploads(id, form.data.unwrap_or_default(), form.uploads, form.append)
        .await?;
    Ok(Json(VacationView::new(vacation, None, state.images())))
}

// ============================================================
// DELETE /vacations/{id}
// ============================================================

async fn delete_vacation(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> VoyageResult<StatusCode> {
    auth.require_admin()?;
    state.catalog.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
