use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::extractor::CurrentUser;
use crate::db;
use crate::error::AppError;
use crate::models::{Permission, Product};
use crate::money;
use crate::social;
use crate::state::SharedState;

/// Amounts may arrive as `"12.50"` or `12.5`.
#[derive(Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    Text(String),
    Number(serde_json::Number),
}

impl AmountInput {
    fn to_cents(&self) -> Result<i64, String> {
        match self {
            AmountInput::Text(s) => money::parse_cents(s),
            AmountInput::Number(n) => money::parse_cents(&n.to_string()),
        }
    }
}

#[derive(Deserialize)]
pub struct LookupRequest {
    pub product: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: AmountInput,
    #[serde(default)]
    pub stock: i32,
}

#[derive(Deserialize)]
pub struct ChangePriceRequest {
    pub product: Option<String>,
    pub new_price: Option<AmountInput>,
}

#[derive(Serialize)]
pub struct ProductResponse {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: String,
    pub stock: i32,
}

impl From<&Product> for ProductResponse {
    fn from(p: &Product) -> Self {
        Self {
            id: p.id,
            name: p.name.clone(),
            description: p.description.clone(),
            price: p.price(),
            stock: p.stock,
        }
    }
}

pub async fn list(State(state): State<SharedState>) -> Result<Json<Vec<ProductResponse>>, AppError> {
    let products = db::products::list_all(&state.pool).await?;
    Ok(Json(products.iter().map(ProductResponse::from).collect()))
}

pub async fn lookup(
    current: CurrentUser,
    State(state): State<SharedState>,
    Json(req): Json<LookupRequest>,
) -> Result<Json<ProductResponse>, AppError> {
    current.require(Permission::ViewProducts)?;

    let name = req
        .product
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| AppError::BadRequest("No product name was given".to_string()))?;

    let product = db::products::find_by_name(&state.pool, name)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

    Ok(Json(ProductResponse::from(&product)))
}

pub async fn create(
    current: CurrentUser,
    State(state): State<SharedState>,
    Json(req): Json<CreateProductRequest>,
) -> Result<Json<ProductResponse>, AppError> {
    current.require(Permission::AddProducts)?;

    let name = req.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Product name is required".to_string()));
    }
    if req.stock < 0 {
        return Err(AppError::BadRequest("Stock cannot be negative".to_string()));
    }
    let price_cents = req.price.to_cents().map_err(AppError::BadRequest)?;

    let product = db::products::create(&state.pool, name, req.description.trim(), price_cents, req.stock)
        .await
        .map_err(|e| {
            if db::is_unique_violation(&e) {
                AppError::Conflict("A product with that name already exists".to_string())
            } else {
                AppError::Database(e)
            }
        })?;

    tracing::info!(product = %product.name, user_id = %current.user.id, "Product added");

    if let Some(client) = state.social.clone() {
        let text = social::product_announcement(&product.name, &product.price());
        tokio::spawn(async move {
            if let Err(e) = client.post_status(&text).await {
                tracing::warn!("Failed to announce product: {e}");
            }
        });
    }

    Ok(Json(ProductResponse::from(&product)))
}

pub async fn change_price(
    current: CurrentUser,
    State(state): State<SharedState>,
    Json(req): Json<ChangePriceRequest>,
) -> Result<Json<ProductResponse>, AppError> {
    current.require(Permission::ChangeProducts)?;

    let (Some(name), Some(new_price)) = (
        req.product.as_deref().map(str::trim).filter(|n| !n.is_empty()),
        req.new_price,
    ) else {
        return Err(AppError::BadRequest(
            "Please provide both product name and new price".to_string(),
        ));
    };

    let price_cents = new_price.to_cents().map_err(AppError::BadRequest)?;

    let product = db::products::update_price(&state.pool, name, price_cents)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

    tracing::info!(product = %product.name, price = %product.price(), "Price changed");

    Ok(Json(ProductResponse::from(&product)))
}

pub async fn delete(
    current: CurrentUser,
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    current.require(Permission::DeleteProducts)?;

    if !db::products::delete_by_name(&state.pool, &name).await? {
        return Err(AppError::NotFound("Product not found".to_string()));
    }

    Ok(Json(serde_json::json!({ "deleted": name })))
}
