use askama::Template;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Form, Router};
use rusqlite::Connection;

use crate::blog::{comments, ownership, Access};
use crate::db::models::Comment;
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::forms::{CommentForm, FormErrors};
use crate::routes::home::Html;
use crate::routes::parse_id;
use crate::state::AppState;

#[derive(Template)]
#[template(path = "blog/comment.html")]
pub struct CommentTemplate {
    pub current_user: Option<String>,
    pub comment: Comment,
    pub text: String,
    pub errors: FormErrors,
    pub deleting: bool,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/posts/{id}/edit_comment/{comment_id}/",
            get(edit_page).post(edit),
        )
        .route(
            "/posts/{id}/delete_comment/{comment_id}/",
            get(delete_page).post(delete),
        )
}

/// Load a comment on the given post for its author.
/// Anyone else is sent back to the post.
fn authored_comment(
    conn: &Connection,
    (post_id, comment_id): (String, String),
    user: &CurrentUser,
) -> AppResult<Result<Comment, Response>> {
    let post_id = parse_id(&post_id)?;
    let comment_id = parse_id(&comment_id)?;
    let comment = comments::find_on_post(conn, post_id, comment_id)?.ok_or(AppError::NotFound)?;
    match ownership::check(&comment, user) {
        Access::Allow => Ok(Ok(comment)),
        Access::Deny { redirect_to } => Ok(Err(Redirect::to(&redirect_to).into_response())),
    }
}

fn post_url(comment: &Comment) -> String {
    format!("/posts/{}/", comment.post_id)
}

async fn edit_page(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(ids): Path<(String, String)>,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let comment = match authored_comment(&conn, ids, &user)? {
        Ok(comment) => comment,
        Err(redirect) => return Ok(redirect),
    };

    Ok(Html(CommentTemplate {
        current_user: Some(user.username),
        text: comment.text.clone(),
        comment,
        errors: FormErrors::default(),
        deleting: false,
    })
    .into_response())
}

async fn edit(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(ids): Path<(String, String)>,
    Form(form): Form<CommentForm>,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let comment = match authored_comment(&conn, ids, &user)? {
        Ok(comment) => comment,
        Err(redirect) => return Ok(redirect),
    };

    match form.validate() {
        Ok(text) => {
            comments::update(&conn, comment.id, &text)?;
            tracing::info!("User {} edited comment {}", user.username, comment.id);
            Ok(Redirect::to(&post_url(&comment)).into_response())
        }
        Err(errors) => Ok(Html(CommentTemplate {
            current_user: Some(user.username),
            comment,
            text: form.text,
            errors,
            deleting: false,
        })
        .into_response()),
    }
}

async fn delete_page(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(ids): Path<(String, String)>,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let comment = match authored_comment(&conn, ids, &user)? {
        Ok(comment) => comment,
        Err(redirect) => return Ok(redirect),
    };

    Ok(Html(CommentTemplate {
        current_user: Some(user.username),
        text: comment.text.clone(),
        comment,
        errors: FormErrors::default(),
        deleting: true,
    })
    .into_response())
}

async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(ids): Path<(String, String)>,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let comment = match authored_comment(&conn, ids, &user)? {
        Ok(comment) => comment,
        Err(redirect) => return Ok(redirect),
    };

    comments::delete(&conn, comment.id)?;
    tracing::info!("User {} deleted comment {}", user.username, comment.id);

    Ok(Redirect::to(&post_url(&comment)).into_response())
}
