pub mod assets;
pub mod auth;
pub mod category;
pub mod comments;
pub mod home;
pub mod pages;
pub mod posts;
pub mod profile;
pub mod same_origin;

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::error::{not_found_page, AppError, AppResult};
use crate::state::AppState;

/// Build the full application router.
pub fn app(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes();

    Router::new()
        .merge(home::router())
        .merge(posts::router())
        .merge(comments::router())
        .merge(category::router())
        .merge(profile::router())
        .merge(auth::router())
        .merge(pages::router())
        .route("/assets/{*path}", get(assets::serve))
        .route("/media/{*path}", get(assets::media))
        .fallback(|| async { not_found_page() })
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn(same_origin::reject_cross_origin))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Numeric path segment. Anything else is treated as a missing page.
pub(crate) fn parse_id(raw: &str) -> AppResult<i64> {
    raw.parse().map_err(|_| AppError::NotFound)
}
