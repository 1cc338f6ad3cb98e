use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::Product;

pub const SESSION_CART_KEY: &str = "cart";

/// Session-held mapping of product name to requested quantity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    items: BTreeMap<String, u32>,
}

impl Cart {
    /// Adds `quantity` to whatever is already held for `item` and returns the new total.
    pub fn add(&mut self, item: &str, quantity: u32) -> u32 {
        let entry = self.items.entry(item.to_string()).or_insert(0);
        *entry = entry.saturating_add(quantity.max(1));
        *entry
    }

    pub fn quantity(&self, item: &str) -> Option<u32> {
        self.items.get(item).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn names(&self) -> Vec<String> {
        self.items.keys().cloned().collect()
    }

    /// Resolves each entry against `catalog`. Entries whose product is gone are skipped.
    pub fn summarize(&self, catalog: &[Product]) -> CartSummary {
        let lines: Vec<CartLine> = self
            .items
            .iter()
            .filter_map(|(name, &quantity)| {
                let product = catalog.iter().find(|p| &p.name == name)?;
                Some(CartLine {
                    product: product.clone(),
                    quantity,
                    subtotal_cents: product.price_cents.saturating_mul(i64::from(quantity)),
                })
            })
            .collect();

        let total_cents = lines
            .iter()
            .fold(0i64, |acc, line| acc.saturating_add(line.subtotal_cents));

        CartSummary { lines, total_cents }
    }
}

#[derive(Debug, Clone)]
pub struct CartLine {
    pub product: Product,
    pub quantity: u32,
    pub subtotal_cents: i64,
}

#[derive(Debug, Clone)]
pub struct CartSummary {
    pub lines: Vec<CartLine>,
    pub total_cents: i64,
}

/// Form input to quantity: anything missing, non-numeric or below one becomes 1.
pub fn parse_quantity(raw: Option<&str>) -> u32 {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|&q| q >= 1)
        .map(|q| u32::try_from(q).unwrap_or(u32::MAX))
        .unwrap_or(1)
}
