pub mod auth;
pub mod shop;

use axum::routing::get;
use axum::Router;

use crate::state::SharedState;

pub fn view_routes() -> Router<SharedState> {
    Router::new()
        // Shop
        .route("/", get(shop::products_page))
        .route("/cart", get(shop::cart_page))
        // Auth
        .route("/auth/login", get(auth::login_page))
        .route("/auth/register", get(auth::register_page))
        .route("/account", get(auth::account_page))
        .route("/auth/forgot-password", get(auth::forgot_password_page))
        .route("/reset/{token}/", get(auth::reset_link_page))
}
