use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::cart::{self, Cart, CartSummary, SESSION_CART_KEY};
use crate::db;
use crate::error::AppError;
use crate::money;
use crate::state::SharedState;

#[derive(Deserialize)]
#[serde(untagged)]
pub enum QuantityInput {
    Text(String),
    Number(serde_json::Number),
}

#[derive(Deserialize)]
pub struct AddItemRequest {
    pub item: Option<String>,
    pub quantity: Option<QuantityInput>,
}

#[derive(Serialize)]
pub struct CartLineResponse {
    pub product: String,
    pub unit_price: String,
    pub quantity: u32,
    pub subtotal: String,
}

#[derive(Serialize)]
pub struct CartResponse {
    pub items: Vec<CartLineResponse>,
    pub total: String,
}

impl From<&CartSummary> for CartResponse {
    fn from(summary: &CartSummary) -> Self {
        Self {
            items: summary
                .lines
                .iter()
                .map(|line| CartLineResponse {
                    product: line.product.name.clone(),
                    unit_price: line.product.price(),
                    quantity: line.quantity,
                    subtotal: money::format_cents(line.subtotal_cents),
                })
                .collect(),
            total: money::format_cents(summary.total_cents),
        }
    }
}

pub async fn load(session: &Session) -> Result<Cart, AppError> {
    Ok(session.get::<Cart>(SESSION_CART_KEY).await?.unwrap_or_default())
}

/// Prices the cart against the current catalogue.
pub async fn summarize(state: &SharedState, cart: &Cart) -> Result<CartSummary, AppError> {
    if cart.is_empty() {
        return Ok(cart.summarize(&[]));
    }
    let products = db::products::find_by_names(&state.pool, &cart.names()).await?;
    Ok(cart.summarize(&products))
}

pub async fn add_item(
    State(state): State<SharedState>,
    session: Session,
    Json(req): Json<AddItemRequest>,
) -> Result<Json<CartResponse>, AppError> {
    let item = req
        .item
        .as_deref()
        .map(str::trim)
        .filter(|i| !i.is_empty())
        .ok_or_else(|| AppError::BadRequest("Item is required".to_string()))?;

    let raw_quantity = req.quantity.map(|q| match q {
        QuantityInput::Text(s) => s,
        QuantityInput::Number(n) => n.to_string(),
    });
    let quantity = cart::parse_quantity(raw_quantity.as_deref());

    let mut cart = load(&session).await?;
    let total = cart.add(item, quantity);
    session.insert(SESSION_CART_KEY, &cart).await?;

    tracing::debug!(item, quantity, total, "Cart updated");

    let summary = summarize(&state, &cart).await?;
    Ok(Json(CartResponse::from(&summary)))
}

pub async fn show(
    State(state): State<SharedState>,
    session: Session,
) -> Result<Json<CartResponse>, AppError> {
    let cart = load(&session).await?;
    let summary = summarize(&state, &cart).await?;
    Ok(Json(CartResponse::from(&summary)))
}

pub async fn clear(session: Session) -> Result<Json<CartResponse>, AppError> {
    let mut cart = load(&session).await?;
    cart.clear();
    session.insert(SESSION_CART_KEY, &cart).await?;
    Ok(Json(CartResponse::from(&cart.summarize(&[]))))
}
