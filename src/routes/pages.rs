use askama::Template;
use axum::routing::get;
use axum::Router;

use crate::extractors::MaybeUser;
use crate::routes::home::Html;
use crate::state::AppState;

#[derive(Template)]
#[template(path = "pages/about.html")]
pub struct AboutTemplate {
    pub current_user: Option<String>,
}

#[derive(Template)]
#[template(path = "pages/rules.html")]
pub struct RulesTemplate {
    pub current_user: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/pages/about/", get(about))
        .route("/pages/rules/", get(rules))
}

async fn about(maybe_user: MaybeUser) -> Html<AboutTemplate> {
    Html(AboutTemplate {
        current_user: maybe_user.username(),
    })
}

async fn rules(maybe_user: MaybeUser) -> Html<RulesTemplate> {
    Html(RulesTemplate {
        current_user: maybe_user.username(),
    })
}
