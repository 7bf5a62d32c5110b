use askama::Template;
use axum::extract::multipart::MultipartError;
use axum::extract::rejection::FormRejection;
use axum::extract::{Multipart, Path, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Form, Router};
use rusqlite::Connection;

use crate::blog::posts::PostInput;
use crate::blog::{self, comments, ownership, posts, taxonomy, Access, Publication, Viewer};
use crate::db::models::{Category, Comment, Location, Post};
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, MaybeUser};
use crate::forms::{CommentForm, FormErrors, PostForm, UploadedImage};
use crate::routes::home::Html;
use crate::routes::parse_id;
use crate::state::AppState;

// --- Templates ---

#[derive(Template)]
#[template(path = "blog/detail.html")]
pub struct DetailTemplate {
    pub current_user: Option<String>,
    pub post: Post,
    pub comments: Vec<Comment>,
    pub is_author: bool,
    pub viewer_id: Option<i64>,
    pub comment_text: String,
    pub errors: FormErrors,
}

impl DetailTemplate {
    pub fn owns(&self, author_id: &i64) -> bool {
        self.viewer_id == Some(*author_id)
    }
}

#[derive(Template)]
#[template(path = "blog/create.html")]
pub struct PostFormTemplate {
    pub current_user: Option<String>,
    pub form: PostForm,
    pub errors: FormErrors,
    pub categories: Vec<Category>,
    pub locations: Vec<Location>,
    /// Edit URL of the post being changed, None when creating.
    pub editing: Option<String>,
}

#[derive(Template)]
#[template(path = "blog/post_delete.html")]
pub struct DeleteTemplate {
    pub current_user: Option<String>,
    pub post: Post,
}

// --- Router ---

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/posts/create/", get(create_page).post(create))
        .route("/posts/{id}/", get(detail).post(add_comment))
        .route("/posts/{id}/comment/", axum::routing::post(add_comment))
        .route("/posts/{id}/edit/", get(edit_page).post(edit))
        .route("/posts/{id}/delete/", get(delete_page).post(delete))
}

// --- Helpers ---

/// Look up a post and check the viewer may see it.
/// Unknown ids are an error; hidden posts come back as None.
fn visible_post(conn: &Connection, id: i64, viewer: Viewer) -> AppResult<Option<Post>> {
    let post = posts::find(conn, id)?.ok_or(AppError::NotFound)?;
    if Publication::of(&post).visible_to(viewer, blog::now()) {
        Ok(Some(post))
    } else {
        Ok(None)
    }
}

fn render_detail(
    conn: &Connection,
    post: Post,
    maybe_user: &MaybeUser,
    comment_text: String,
    errors: FormErrors,
) -> AppResult<Response> {
    let comments = comments::list_for_post(conn, post.id)?;
    let viewer = maybe_user.viewer();
    Ok(Html(DetailTemplate {
        current_user: maybe_user.username(),
        is_author: viewer.is(post.author_id),
        viewer_id: viewer.user_id(),
        post,
        comments,
        comment_text,
        errors,
    })
    .into_response())
}

fn multipart_error(e: MultipartError) -> AppError {
    AppError::BadRequest(e.body_text())
}

/// Read the post form out of a multipart body. An empty file input is
/// treated as no upload.
async fn read_post_form(
    mut multipart: Multipart,
    mut form: PostForm,
) -> AppResult<(PostForm, Option<UploadedImage>)> {
    let mut image = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or("").to_string();
        if name == "image" {
            let file_name = field.file_name().unwrap_or("").to_string();
            let bytes = field.bytes().await.map_err(multipart_error)?;
            if !file_name.is_empty() && !bytes.is_empty() {
                image = Some(UploadedImage {
                    file_name,
                    bytes: bytes.to_vec(),
                });
            }
        } else {
            let value = field.text().await.map_err(multipart_error)?;
            form.set_field(&name, value);
        }
    }
    Ok((form, image))
}

fn choices(conn: &Connection) -> AppResult<(Vec<Category>, Vec<Location>)> {
    Ok((
        taxonomy::list_categories(conn)?,
        taxonomy::list_locations(conn)?,
    ))
}

/// Load a post for its author. Anyone else is sent back to the post.
fn authored_post(conn: &Connection, id: i64, user: &CurrentUser) -> AppResult<Result<Post, Response>> {
    let post = posts::find(conn, id)?.ok_or(AppError::NotFound)?;
    match ownership::check(&post, user) {
        Access::Allow => Ok(Ok(post)),
        Access::Deny { redirect_to } => Ok(Err(Redirect::to(&redirect_to).into_response())),
    }
}

fn insert_post(state: &AppState, author_id: i64, input: &PostInput) -> AppResult<i64> {
    let conn = state.db.get()?;
    Ok(posts::insert(&conn, author_id, input)?)
}

fn update_post(state: &AppState, id: i64, input: &PostInput) -> AppResult<()> {
    let conn = state.db.get()?;
    Ok(posts::update(&conn, id, input)?)
}

/// Drop a freshly stored upload whose post was never saved.
async fn discard_upload(state: &AppState, stored: Option<&str>) {
    if let Some(stored) = stored {
        tracing::warn!(path = %stored, "post not saved, discarding upload");
        state.media.remove(stored).await;
    }
}

// --- Handlers ---

async fn detail(
    State(state): State<AppState>,
    maybe_user: MaybeUser,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let id = parse_id(&id)?;
    let conn = state.db.get()?;
    match visible_post(&conn, id, maybe_user.viewer())? {
        Some(post) => render_detail(&conn, post, &maybe_user, String::new(), FormErrors::default()),
        None => Ok(Redirect::to("/").into_response()),
    }
}

/// Comment submission. Anonymous submissions are ignored, whatever their
/// body, and the page is shown again.
async fn add_comment(
    State(state): State<AppState>,
    maybe_user: MaybeUser,
    Path(id): Path<String>,
    form: Result<Form<CommentForm>, FormRejection>,
) -> AppResult<Response> {
    let id = parse_id(&id)?;
    let conn = state.db.get()?;
    let Some(post) = visible_post(&conn, id, maybe_user.viewer())? else {
        return Ok(Redirect::to("/").into_response());
    };

    let Some(user) = maybe_user.0.as_ref() else {
        return render_detail(&conn, post, &maybe_user, String::new(), FormErrors::default());
    };
    let Form(form) = form.map_err(|e| AppError::BadRequest(e.body_text()))?;

    match form.validate() {
        Ok(text) => {
            let comment_id = comments::insert(&conn, post.id, user.id, &text)?;
            tracing::info!(
                "User {} commented on post {} (comment {})",
                user.username,
                post.id,
                comment_id
            );
            Ok(Redirect::to(&post.url()).into_response())
        }
        Err(errors) => render_detail(&conn, post, &maybe_user, form.text, errors),
    }
}

async fn create_page(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Html<PostFormTemplate>> {
    let conn = state.db.get()?;
    let (categories, locations) = choices(&conn)?;
    Ok(Html(PostFormTemplate {
        current_user: Some(user.username),
        form: PostForm::new_post(blog::now()),
        errors: FormErrors::default(),
        categories,
        locations,
        editing: None,
    }))
}

async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    multipart: Multipart,
) -> AppResult<Response> {
    let (form, image) = read_post_form(multipart, PostForm::default()).await?;
    let (categories, locations) = {
        let conn = state.db.get()?;
        choices(&conn)?
    };

    let mut input = match form.validate(&categories, &locations, image.as_ref()) {
        Ok(input) => input,
        Err(errors) => {
            return Ok(Html(PostFormTemplate {
                current_user: Some(user.username),
                form,
                errors,
                categories,
                locations,
                editing: None,
            })
            .into_response())
        }
    };

    if let Some(image) = &image {
        input.image = Some(state.media.save_post_image(image).await?);
    }

    let post_id = match insert_post(&state, user.id, &input) {
        Ok(id) => id,
        Err(e) => {
            discard_upload(&state, input.image.as_deref()).await;
            return Err(e);
        }
    };
    tracing::info!("User {} created post {}", user.username, post_id);

    Ok(Redirect::to(&format!("/profile/{}/", user.username)).into_response())
}

async fn edit_page(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let id = parse_id(&id)?;
    let conn = state.db.get()?;
    let post = match authored_post(&conn, id, &user)? {
        Ok(post) => post,
        Err(redirect) => return Ok(redirect),
    };
    let (categories, locations) = choices(&conn)?;

    Ok(Html(PostFormTemplate {
        current_user: Some(user.username),
        form: PostForm::from_post(&post),
        errors: FormErrors::default(),
        categories,
        locations,
        editing: Some(format!("{}edit/", post.url())),
    })
    .into_response())
}

async fn edit(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    multipart: Multipart,
) -> AppResult<Response> {
    let id = parse_id(&id)?;
    let (post, categories, locations) = {
        let conn = state.db.get()?;
        let post = match authored_post(&conn, id, &user)? {
            Ok(post) => post,
            Err(redirect) => return Ok(redirect),
        };
        let (categories, locations) = choices(&conn)?;
        (post, categories, locations)
    };

    let blank = PostForm {
        current_image: post.image.clone(),
        ..PostForm::default()
    };
    let (form, image) = read_post_form(multipart, blank).await?;

    let mut input = match form.validate(&categories, &locations, image.as_ref()) {
        Ok(input) => input,
        Err(errors) => {
            return Ok(Html(PostFormTemplate {
                current_user: Some(user.username),
                form,
                errors,
                categories,
                locations,
                editing: Some(format!("{}edit/", post.url())),
            })
            .into_response())
        }
    };

    let uploaded = match &image {
        Some(upload) => Some(state.media.save_post_image(upload).await?),
        None => None,
    };
    input.image = match (&uploaded, &post.image) {
        (Some(stored), _) => Some(stored.clone()),
        (None, Some(_)) if form.image_clear => None,
        (None, old) => old.clone(),
    };

    if let Err(e) = update_post(&state, post.id, &input) {
        discard_upload(&state, uploaded.as_deref()).await;
        return Err(e);
    }
    // The row no longer points at the old file.
    if let Some(old) = &post.image {
        if input.image.as_ref() != Some(old) {
            state.media.remove(old).await;
        }
    }
    tracing::info!("User {} updated post {}", user.username, post.id);

    Ok(Redirect::to(&post.url()).into_response())
}

async fn delete_page(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let id = parse_id(&id)?;
    let conn = state.db.get()?;
    let post = match authored_post(&conn, id, &user)? {
        Ok(post) => post,
        Err(redirect) => return Ok(redirect),
    };

    Ok(Html(DeleteTemplate {
        current_user: Some(user.username),
        post,
    })
    .into_response())
}

async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let id = parse_id(&id)?;
    let post = {
        let conn = state.db.get()?;
        let post = match authored_post(&conn, id, &user)? {
            Ok(post) => post,
            Err(redirect) => return Ok(redirect),
        };
        posts::delete(&conn, post.id)?;
        post
    };

    if let Some(image) = &post.image {
        state.media.remove(image).await;
    }
    tracing::info!("User {} deleted post {}", user.username, post.id);

    Ok(Redirect::to(&format!("/profile/{}/", user.username)).into_response())
}
