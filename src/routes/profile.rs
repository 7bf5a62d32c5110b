use askama::Template;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Form, Router};

use crate::auth::users;
use crate::blog::{self, posts, Page, PageQuery, Scope};
use crate::db::models::{Post, User};
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, MaybeUser};
use crate::forms::{FormErrors, ProfileForm};
use crate::routes::home::Html;
use crate::state::AppState;

#[derive(Template)]
#[template(path = "blog/profile.html")]
pub struct ProfileTemplate {
    pub current_user: Option<String>,
    pub profile: User,
    pub is_owner: bool,
    pub page: Page<Post>,
}

#[derive(Template)]
#[template(path = "blog/user.html")]
pub struct ProfileEditTemplate {
    pub current_user: Option<String>,
    pub form: ProfileForm,
    pub errors: FormErrors,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/profile/edit/", get(edit_page).post(edit))
        .route("/profile/{username}/", get(show))
}

/// A user's page: everything they wrote for themselves, public posts for others.
async fn show(
    State(state): State<AppState>,
    maybe_user: MaybeUser,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> AppResult<Html<ProfileTemplate>> {
    let conn = state.db.get()?;
    let profile = users::find_by_username(&conn, &username)?.ok_or(AppError::NotFound)?;
    let viewer = maybe_user.viewer();

    let page = posts::list_page(
        &conn,
        Scope::Profile(profile.id),
        viewer,
        blog::now(),
        query.requested(),
        state.config.blog.posts_per_page,
    )?;

    Ok(Html(ProfileTemplate {
        current_user: maybe_user.username(),
        is_owner: viewer.is(profile.id),
        profile,
        page,
    }))
}

async fn edit_page(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Html<ProfileEditTemplate>> {
    let conn = state.db.get()?;
    let profile = users::find_by_id(&conn, user.id)?.ok_or(AppError::NotFound)?;

    Ok(Html(ProfileEditTemplate {
        current_user: Some(user.username),
        form: ProfileForm::from_user(&profile),
        errors: FormErrors::default(),
    }))
}

async fn edit(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<ProfileForm>,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let taken = users::username_taken(&conn, form.username.trim(), Some(user.id))?;

    match form.validate(taken) {
        Ok(profile) => {
            users::update_profile(&conn, user.id, &profile)?;
            tracing::info!("User {} updated their profile", profile.username);
            Ok(Redirect::to(&format!("/profile/{}/", profile.username)).into_response())
        }
        Err(errors) => Ok(Html(ProfileEditTemplate {
            current_user: Some(user.username),
            form,
            errors,
        })
        .into_response()),
    }
}
