use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::money;

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price_cents: i64,
    pub stock: i32,
    pub created_at: DateTime<Utc>,
}

impl Product {
    pub fn price(&self) -> String {
        money::format_cents(self.price_cents)
    }
}
