use askama::Template;
use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::Router;

use crate::blog::{self, posts, taxonomy, Page, PageQuery, Scope};
use crate::db::models::{Category, Post};
use crate::error::{AppError, AppResult};
use crate::extractors::MaybeUser;
use crate::routes::home::Html;
use crate::state::AppState;

#[derive(Template)]
#[template(path = "blog/category.html")]
pub struct CategoryTemplate {
    pub current_user: Option<String>,
    pub category: Category,
    pub page: Page<Post>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/category/{slug}/", get(category_posts))
}

/// Posts in one published category. Hidden and unknown categories are 404.
async fn category_posts(
    State(state): State<AppState>,
    maybe_user: MaybeUser,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> AppResult<Html<CategoryTemplate>> {
    let conn = state.db.get()?;
    let category =
        taxonomy::published_category_by_slug(&conn, &slug)?.ok_or(AppError::NotFound)?;

    let page = posts::list_page(
        &conn,
        Scope::Category(category.id),
        maybe_user.viewer(),
        blog::now(),
        query.requested(),
        state.config.blog.posts_per_page,
    )?;

    Ok(Html(CategoryTemplate {
        current_user: maybe_user.username(),
        category,
        page,
    }))
}
