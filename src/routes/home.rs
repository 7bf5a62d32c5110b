use askama::Template;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;

use crate::blog::{self, posts, Page, PageQuery, Scope};
use crate::db::models::Post;
use crate::error::AppResult;
use crate::extractors::MaybeUser;
use crate::state::AppState;

#[derive(Template)]
#[template(path = "blog/index.html")]
pub struct IndexTemplate {
    pub current_user: Option<String>,
    pub page: Page<Post>,
}

/// Wrapper to render askama templates as axum responses
pub struct Html<T: Template>(pub T);

impl<T: Template> IntoResponse for Html<T> {
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(body) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
                body,
            )
                .into_response(),
            Err(e) => {
                tracing::error!("Template render error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
            }
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(index))
}

/// Front page: public posts, plus the viewer's own.
async fn index(
    State(state): State<AppState>,
    maybe_user: MaybeUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Html<IndexTemplate>> {
    let page = {
        let conn = state.db.get()?;
        posts::list_page(
            &conn,
            Scope::Feed,
            maybe_user.viewer(),
            blog::now(),
            query.requested(),
            state.config.blog.posts_per_page,
        )?
    };

    Ok(Html(IndexTemplate {
        current_user: maybe_user.username(),
        page,
    }))
}
