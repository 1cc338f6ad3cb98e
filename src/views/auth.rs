use askama::Template;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use serde::Deserialize;
use tower_sessions::Session;
use uuid::Uuid;

use crate::auth::SESSION_USER_KEY;
use crate::auth::extractor::CurrentUser;
use crate::error::AppError;
use crate::reset::{ResetError, SESSION_RESET_TOKEN_KEY};
use crate::state::SharedState;

#[derive(Template)]
#[template(path = "auth/login.html")]
struct LoginTemplate {
    next: String,
}

#[derive(Template)]
#[template(path = "auth/account.html")]
struct AccountTemplate {
    username: String,
    email: String,
    permissions: Vec<String>,
}

#[derive(Deserialize)]
pub struct LoginQuery {
    next: Option<String>,
}

/// Only same-site paths are followed after login.
fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") => path,
        _ => "/",
    }
}

#[derive(Template)]
#[template(path = "auth/register.html")]
struct RegisterTemplate;

#[derive(Template)]
#[template(path = "auth/forgot_password.html")]
struct ForgotPasswordTemplate;

#[derive(Template)]
#[template(path = "auth/reset_password.html")]
struct ResetPasswordTemplate {
    username: String,
}

#[derive(Template)]
#[template(path = "auth/reset_invalid.html")]
struct ResetInvalidTemplate;

#[derive(Template)]
#[template(path = "auth/reset_expired.html")]
struct ResetExpiredTemplate;

pub async fn login_page(
    session: Session,
    Query(query): Query<LoginQuery>,
) -> Result<Response, AppError> {
    let next = safe_next(query.next.as_deref());
    // Already logged in
    if session.get::<Uuid>(SESSION_USER_KEY).await?.is_some() {
        return Ok(Redirect::to(next).into_response());
    }
    let template = LoginTemplate {
        next: next.to_string(),
    };
    Ok(Html(template.render().unwrap_or_default()).into_response())
}

pub async fn account_page(current: CurrentUser) -> impl IntoResponse {
    let mut permissions: Vec<String> = current
        .permissions
        .iter()
        .map(|p| p.codename().to_string())
        .collect();
    permissions.sort();

    let template = AccountTemplate {
        username: current.user.username,
        email: current.user.email,
        permissions,
    };
    Html(template.render().unwrap_or_default())
}

pub async fn register_page() -> impl IntoResponse {
    Html(RegisterTemplate.render().unwrap_or_default())
}

pub async fn forgot_password_page() -> impl IntoResponse {
    Html(ForgotPasswordTemplate.render().unwrap_or_default())
}

/// Landing page for the emailed link. A live token is parked in the session
/// so the follow-up form submission does not need to carry it.
pub async fn reset_link_page(
    State(state): State<SharedState>,
    session: Session,
    Path(token): Path<String>,
) -> Result<Response, AppError> {
    match state.resets.validate(&token).await {
        Ok(user) => {
            session.insert(SESSION_RESET_TOKEN_KEY, &token).await?;
            let template = ResetPasswordTemplate {
                username: user.username,
            };
            Ok(Html(template.render().unwrap_or_default()).into_response())
        }
        Err(ResetError::Expired) => Ok((
            StatusCode::GONE,
            Html(ResetExpiredTemplate.render().unwrap_or_default()),
        )
            .into_response()),
        Err(ResetError::Invalid) => Ok((
            StatusCode::BAD_REQUEST,
            Html(ResetInvalidTemplate.render().unwrap_or_default()),
        )
            .into_response()),
        Err(e) => Err(e.into()),
    }
}
