//! # voyage-api
//!
//! REST API layer for Voyage. Authenticates callers, checks the admin role
//! where required, and hands each request to the catalog, the follow
//! coordinator, or the listing engine.

pub mod middleware;
pub mod routes;

use axum::{extract::DefaultBodyLimit, Router};
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;
use voyage_common::config::LimitsConfig;
use voyage_db::{
    catalog::VacationCatalog, coordinator::FollowCountCoordinator, images::ImageAssetManager,
    listing::ListingQueryEngine, Database,
};

/// Images accepted in a single create/update request.
pub const MAX_IMAGES_PER_REQUEST: usize = 10;

/// Room for the JSON `data` part and multipart framing.
const FORM_OVERHEAD_BYTES: usize = 256 * 1024;

/// Shared application state available to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub catalog: VacationCatalog,
    pub coordinator: FollowCountCoordinator,
    pub listing: ListingQueryEngine,
    /// HS256 secret used to verify access tokens.
    pub jwt_secret: String,
}

impl AppState {
    pub fn new(
        db: Database,
        images: ImageAssetManager,
        limits: &LimitsConfig,
        jwt_secret: impl Into<String>,
    ) -> Self {
        Self {
            catalog: VacationCatalog::new(db.clone(), images),
            coordinator: FollowCountCoordinator::new(db.clone()),
            listing: ListingQueryEngine::new(
                db.clone(),
                limits.default_page_size,
                limits.max_page_size,
            ),
            db,
            jwt_secret: jwt_secret.into(),
        }
    }

    pub fn images(&self) -> &ImageAssetManager {
        self.catalog.images()
    }

    /// Largest request body accepted anywhere in the API.
    pub fn max_body_bytes(&self) -> usize {
        self.images()
            .max_bytes()
            .saturating_mul(MAX_IMAGES_PER_REQUEST)
            .saturating_add(FORM_OVERHEAD_BYTES)
    }
}

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let state = Arc::new(state);
    let max_body = state.max_body_bytes();

    let authenticated = Router::new()
        .merge(routes::vacations::router())
        .merge(routes::follows::router())
        .merge(routes::stats::router())
        .merge(routes::users::router())
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    let api_routes = Router::new()
        .merge(authenticated)
        .merge(routes::health::router())
        .merge(routes::images::router());

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body))
        .layer(axum::middleware::from_fn(middleware::security_headers))
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(tower_http::compression::CompressionLayer::new())
        .with_state(state)
}
