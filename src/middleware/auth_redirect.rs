use axum::extract::Request;
use axum::http::{Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use url::form_urlencoded;

pub const LOGIN_PATH: &str = "/auth/login";

/// Sends browsers that hit a page needing a login to the login form, remembering
/// where they were headed. Non-GET requests keep their 401.
pub async fn redirect_unauthorized(req: Request, next: Next) -> Response {
    let is_get = req.method() == Method::GET;
    let target = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());

    let response = next.run(req).await;
    if is_get && response.status() == StatusCode::UNAUTHORIZED {
        Redirect::to(&login_url(&target)).into_response()
    } else {
        response
    }
}

pub fn login_url(next: &str) -> String {
    let encoded: String = form_urlencoded::byte_serialize(next.as_bytes()).collect();
    format!("{LOGIN_PATH}?next={encoded}")
}
