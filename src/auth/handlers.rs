use askama::Template;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Form;
use serde::Deserialize;

use crate::auth::{password, session, users};
use crate::error::AppResult;
use crate::extractors::{cookie_value, CurrentUser, MaybeUser};
use crate::forms::{FormErrors, LoginForm, PasswordChangeForm, RegistrationForm, NON_FIELD};
use crate::routes::home::Html;
use crate::state::AppState;

// -- Templates --

#[derive(Template)]
#[template(path = "registration/login.html")]
pub struct LoginTemplate {
    pub current_user: Option<String>,
    pub form: LoginForm,
    pub errors: FormErrors,
}

#[derive(Template)]
#[template(path = "registration/logged_out.html")]
pub struct LoggedOutTemplate {
    pub current_user: Option<String>,
}

#[derive(Template)]
#[template(path = "registration/registration_form.html")]
pub struct RegistrationTemplate {
    pub current_user: Option<String>,
    pub form: RegistrationForm,
    pub errors: FormErrors,
}

#[derive(Template)]
#[template(path = "registration/password_change_form.html")]
pub struct PasswordChangeTemplate {
    pub current_user: Option<String>,
    pub errors: FormErrors,
}

// -- Request types --

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct NextQuery {
    pub next: String,
}

/// Only same-site paths are followed after login.
pub fn safe_next(next: &str) -> &str {
    let local = next.starts_with('/')
        && !next.starts_with("//")
        && !next.contains('\\')
        && !next.chars().any(|c| c.is_ascii_control());
    if local {
        next
    } else {
        "/"
    }
}

// -- Login / logout --

/// GET /auth/login/ — render login form
pub async fn login_page(
    MaybeUser(user): MaybeUser,
    Query(query): Query<NextQuery>,
) -> Html<LoginTemplate> {
    Html(LoginTemplate {
        current_user: user.map(|u| u.username),
        form: LoginForm {
            next: query.next,
            ..LoginForm::default()
        },
        errors: FormErrors::default(),
    })
}

/// POST /auth/login/ — check credentials and start a session
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let username = form.username.trim();

    let mut errors = FormErrors::default();
    if username.is_empty() {
        errors.add("username", "This field is required.");
    }
    if form.password.is_empty() {
        errors.add("password", "This field is required.");
    }

    let user = if errors.is_empty() {
        users::find_by_username(&conn, username)?
            .filter(|user| password::verify_password(&form.password, &user.password_hash))
    } else {
        None
    };

    let Some(user) = user else {
        if errors.is_empty() {
            errors.add(
                NON_FIELD,
                "Please enter a correct username and password. Note that both fields may be case-sensitive.",
            );
        }
        let form = LoginForm {
            password: String::new(),
            ..form
        };
        return Ok(Html(LoginTemplate {
            current_user: None,
            form,
            errors,
        })
        .into_response());
    };

    let token = session::create_session(&conn, user.id, state.config.auth.session_hours)?;
    tracing::info!("User {} logged in", user.username);

    let cookie = session::session_cookie(
        &state.config.auth.cookie_name,
        &token,
        state.config.auth.session_hours,
    );
    Ok((
        StatusCode::SEE_OTHER,
        [
            (header::LOCATION, safe_next(&form.next).to_string()),
            (header::SET_COOKIE, cookie),
        ],
        "",
    )
        .into_response())
}

/// GET|POST /auth/logout/ — delete session and show confirmation
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Response> {
    let cookie_name = &state.config.auth.cookie_name;
    if let Some(token) = cookie_value(&headers, cookie_name) {
        let conn = state.db.get()?;
        session::delete_session(&conn, token)?;
    }

    Ok((
        [(header::SET_COOKIE, session::clear_session_cookie(cookie_name))],
        Html(LoggedOutTemplate { current_user: None }),
    )
        .into_response())
}

// -- Registration --

/// GET /auth/registration/ — render sign-up form
pub async fn registration_page(MaybeUser(user): MaybeUser) -> Html<RegistrationTemplate> {
    Html(RegistrationTemplate {
        current_user: user.map(|u| u.username),
        form: RegistrationForm::default(),
        errors: FormErrors::default(),
    })
}

/// POST /auth/registration/ — create the account, then send the user to log in
pub async fn register(
    State(state): State<AppState>,
    MaybeUser(current): MaybeUser,
    Form(form): Form<RegistrationForm>,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let taken = users::username_taken(&conn, form.username.trim(), None)?;

    match form.validate(taken) {
        Ok((profile, plaintext)) => {
            let hash = password::hash_password(&plaintext, state.config.auth.bcrypt_cost)?;
            let user_id = users::insert(&conn, &profile, &hash)?;
            tracing::info!("Registered user {} (id {})", profile.username, user_id);
            Ok(Redirect::to("/auth/login/").into_response())
        }
        Err(errors) => {
            let form = RegistrationForm {
                password1: String::new(),
                password2: String::new(),
                ..form
            };
            Ok(Html(RegistrationTemplate {
                current_user: current.map(|u| u.username),
                form,
                errors,
            })
            .into_response())
        }
    }
}

// -- Password change --

/// GET /auth/password_change/
pub async fn password_change_page(user: CurrentUser) -> Html<PasswordChangeTemplate> {
    Html(PasswordChangeTemplate {
        current_user: Some(user.username),
        errors: FormErrors::default(),
    })
}

/// POST /auth/password_change/ — replace the password and sign out other sessions
pub async fn password_change(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    Form(form): Form<PasswordChangeForm>,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let stored_hash = users::find_by_id(&conn, user.id)?
        .map(|u| u.password_hash)
        .unwrap_or_default();
    let old_ok = password::verify_password(&form.old_password, &stored_hash);

    match form.validate(old_ok, &user.username) {
        Ok(new_password) => {
            let hash = password::hash_password(&new_password, state.config.auth.bcrypt_cost)?;
            users::update_password(&conn, user.id, &hash)?;
            if let Some(token) = cookie_value(&headers, &state.config.auth.cookie_name) {
                session::delete_other_sessions(&conn, user.id, token)?;
            }
            tracing::info!("User {} changed their password", user.username);
            Ok(Redirect::to(&format!("/profile/{}/", user.username)).into_response())
        }
        Err(errors) => Ok(Html(PasswordChangeTemplate {
            current_user: Some(user.username),
            errors,
        })
        .into_response()),
    }
}
