use askama::Template;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};

use crate::routes::home::Html;

#[derive(Template)]
#[template(path = "pages/403.html")]
pub struct ForbiddenTemplate {
    pub current_user: Option<String>,
}

#[derive(Template)]
#[template(path = "pages/404.html")]
pub struct NotFoundTemplate {
    pub current_user: Option<String>,
}

#[derive(Template)]
#[template(path = "pages/500.html")]
pub struct ServerErrorTemplate {
    pub current_user: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found")]
    NotFound,

    /// Refused before reaching a handler, e.g. a cross-site form post.
    #[error("Forbidden")]
    Forbidden,

    /// Carries the path the visitor should come back to after signing in.
    #[error("Login required")]
    LoginRequired(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Password hashing error: {0}")]
    Password(#[from] bcrypt::BcryptError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Build the login URL that returns to `next` afterwards.
pub fn login_url(next: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(next.as_bytes()).collect();
    format!("/auth/login/?next={}", encoded)
}

pub fn not_found_page() -> Response {
    (
        StatusCode::NOT_FOUND,
        Html(NotFoundTemplate { current_user: None }),
    )
        .into_response()
}

fn server_error_page() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Html(ServerErrorTemplate { current_user: None }),
    )
        .into_response()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::NotFound => not_found_page(),
            AppError::Forbidden => (
                StatusCode::FORBIDDEN,
                Html(ForbiddenTemplate { current_user: None }),
            )
                .into_response(),
            AppError::LoginRequired(next) => Redirect::to(&login_url(&next)).into_response(),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                server_error_page()
            }
            AppError::Pool(e) => {
                tracing::error!("Pool error: {}", e);
                server_error_page()
            }
            AppError::Password(e) => {
                tracing::error!("Password hashing error: {}", e);
                server_error_page()
            }
            AppError::Io(e) => {
                tracing::error!("I/O error: {}", e);
                server_error_page()
            }
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
