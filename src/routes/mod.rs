pub mod auth;
pub mod cart;
pub mod products;

use axum::routing::{delete, get, post, put};
use axum::Router;

use crate::state::SharedState;

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        // Auth
        .route("/api/v1/auth/register", post(auth::register))
        .route("/api/v1/auth/login", post(auth::login))
        .route("/api/v1/auth/logout", post(auth::logout))
        .route("/api/v1/auth/me", get(auth::me))
        .route("/api/v1/auth/forgot-password", post(auth::forgot_password))
        .route("/api/v1/auth/reset-password", post(auth::reset_password))
        // Catalogue
        .route(
            "/api/v1/products",
            get(products::list).post(products::create),
        )
        .route("/api/v1/products/lookup", post(products::lookup))
        .route("/api/v1/products/price", put(products::change_price))
        .route("/api/v1/products/{name}", delete(products::delete))
        // Cart
        .route(
            "/api/v1/cart",
            get(cart::show).delete(cart::clear),
        )
        .route("/api/v1/cart/items", post(cart::add_item))
}
