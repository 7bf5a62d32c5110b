use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use rust_embed::Embed;

use crate::error::{not_found_page, AppResult};
use crate::state::AppState;

#[derive(Embed)]
#[folder = "assets/"]
struct Assets;

/// Stylesheets and other files compiled into the binary.
pub async fn serve(Path(path): Path<String>) -> Response {
    match Assets::get(&path) {
        Some(file) => {
            let mime = mime_guess::from_path(&path).first_or_octet_stream();
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, mime.as_ref().to_string()),
                    (header::CACHE_CONTROL, "public, max-age=86400".to_string()),
                ],
                file.data.to_vec(),
            )
                .into_response()
        }
        None => not_found_page(),
    }
}

/// Uploaded images from the uploads directory.
pub async fn media(State(state): State<AppState>, Path(path): Path<String>) -> AppResult<Response> {
    match state.media.read(&path).await? {
        Some(data) => {
            let mime = mime_guess::from_path(&path).first_or_octet_stream();
            Ok((
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, mime.as_ref().to_string()),
                    (header::CACHE_CONTROL, "public, max-age=3600".to_string()),
                ],
                data,
            )
                .into_response())
        }
        None => Ok(not_found_page()),
    }
}
