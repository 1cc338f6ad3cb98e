pub mod auth;
pub mod cart;
pub mod config;
pub mod db;
pub mod email;
pub mod error;
pub mod middleware;
pub mod models;
pub mod money;
pub mod rate_limit;
pub mod reset;
pub mod routes;
pub mod social;
pub mod state;
pub mod views;

use std::time::Duration as StdDuration;

use axum::http::{HeaderName, HeaderValue};
use axum::Router;
use sqlx::PgPool;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tower_sessions::cookie::time::Duration;
use tower_sessions::cookie::SameSite;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;

use crate::middleware::auth_redirect::redirect_unauthorized;
use crate::state::SharedState;

/// Session store on the application database; creates its table on first use.
pub async fn session_store(pool: &PgPool) -> Result<PostgresStore, sqlx::Error> {
    let store = PostgresStore::new(pool.clone());
    store.migrate().await?;
    Ok(store)
}

pub fn build_app(state: SharedState, session_store: PostgresStore) -> Router {
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(state.config.session.cookie_secure)
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_expiry(Expiry::OnInactivity(Duration::minutes(
            state.config.session.idle_minutes,
        )));

    Router::new()
        .merge(routes::api_routes())
        .merge(views::view_routes().layer(axum::middleware::from_fn(redirect_unauthorized)))
        .route("/health", axum::routing::get(health))
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-content-type-options"),
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-frame-options"),
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("referrer-policy"),
            HeaderValue::from_static("no-referrer"),
        ))
        .with_state(state)
}

/// Periodically forget stale rate limiter windows.
pub fn spawn_limiter_cleanup(state: SharedState) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(StdDuration::from_secs(10 * 60));
        loop {
            tick.tick().await;
            state.login_limiter.cleanup(StdDuration::from_secs(15 * 60));
            state.reset_limiter.cleanup(StdDuration::from_secs(15 * 60));
        }
    })
}

async fn health() -> &'static str {
    "ok"
}
