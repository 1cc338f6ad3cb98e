use askama::Template;
use axum::extract::State;
use axum::response::{Html, IntoResponse};
use tower_sessions::Session;

use crate::db;
use crate::error::AppError;
use crate::money;
use crate::routes::cart;
use crate::state::SharedState;

struct ProductRow {
    name: String,
    description: String,
    price: String,
    stock: i32,
}

struct CartRow {
    name: String,
    unit_price: String,
    quantity: u32,
    subtotal: String,
}

#[derive(Template)]
#[template(path = "shop/products.html")]
struct ProductsTemplate {
    products: Vec<ProductRow>,
}

#[derive(Template)]
#[template(path = "shop/cart.html")]
struct CartTemplate {
    lines: Vec<CartRow>,
    total: String,
}

pub async fn products_page(State(state): State<SharedState>) -> Result<impl IntoResponse, AppError> {
    let products = db::products::list_all(&state.pool)
        .await?
        .into_iter()
        .map(|p| ProductRow {
            price: p.price(),
            name: p.name,
            description: p.description,
            stock: p.stock,
        })
        .collect();

    let template = ProductsTemplate { products };
    Ok(Html(template.render().unwrap_or_default()))
}

pub async fn cart_page(
    State(state): State<SharedState>,
    session: Session,
) -> Result<impl IntoResponse, AppError> {
    let cart = cart::load(&session).await?;
    let summary = cart::summarize(&state, &cart).await?;

    let template = CartTemplate {
        lines: summary
            .lines
            .iter()
            .map(|line| CartRow {
                name: line.product.name.clone(),
                unit_price: line.product.price(),
                quantity: line.quantity,
                subtotal: money::format_cents(line.subtotal_cents),
            })
            .collect(),
        total: money::format_cents(summary.total_cents),
    };
    Ok(Html(template.render().unwrap_or_default()))
}
