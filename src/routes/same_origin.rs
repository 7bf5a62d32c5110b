//! Cross-site form posts are refused with the 403 page.
//!
//! Browsers attach an `Origin` header to every POST. When it is present it
//! must name the host the request was sent to. Requests without one (older
//! clients, curl) go through; the session cookie is `SameSite=Strict` so
//! they carry no session from another site anyway.

use axum::body::Body;
use axum::http::uri::Authority;
use axum::http::{header, HeaderMap, Method, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use url::Url;

use crate::error::AppError;

pub async fn reject_cross_origin(request: Request<Body>, next: Next) -> Response {
    let safe = matches!(*request.method(), Method::GET | Method::HEAD | Method::OPTIONS);
    if safe || origin_matches_host(request.headers()) {
        return next.run(request).await;
    }
    tracing::warn!(
        method = %request.method(),
        path = %request.uri().path(),
        origin = ?request.headers().get(header::ORIGIN),
        "cross-origin request refused"
    );
    AppError::Forbidden.into_response()
}

fn origin_matches_host(headers: &HeaderMap) -> bool {
    let Some(origin) = headers.get(header::ORIGIN) else {
        return true;
    };
    let origin = match origin.to_str().ok().and_then(|o| Url::parse(o).ok()) {
        Some(url) => url,
        // "null" and other opaque origins
        None => return false,
    };
    let host = match headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.parse::<Authority>().ok())
    {
        Some(host) => host,
        None => return false,
    };

    let same_host = origin
        .host_str()
        .is_some_and(|name| name.eq_ignore_ascii_case(host.host()));
    let origin_port = origin.port_or_known_default();
    same_host && host.port_u16().or(origin_port) == origin_port
}
