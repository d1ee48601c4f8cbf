//! Product Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Product entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Category reference (String ID, required)
    pub category: String,
    /// Unit price, non-negative
    pub price: Decimal,
    /// Units on hand; `None` means unlimited (no stock tracking)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock: Option<i64>,
    pub sort_order: i32,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Product {
    /// Whether `quantity` more units can be taken from stock.
    /// Untracked stock (`None`) always has enough.
    pub fn has_stock_for(&self, quantity: i64) -> bool {
        match self.stock {
            None => true,
            Some(stock) => stock >= quantity,
        }
    }
}

/// Create product payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductCreate {
    pub name: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub category: String,
    pub price: Decimal,
    pub stock: Option<i64>,
    pub sort_order: Option<i32>,
}

/// Update product payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub category: Option<String>,
    pub price: Option<Decimal>,
    /// Outer `None` = no change; `Some(None)` = stop tracking stock
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<Option<i64>>,
    pub sort_order: Option<i32>,
    pub is_active: Option<bool>,
}
