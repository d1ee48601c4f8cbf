//! Storefront configuration

use rust_decimal::Decimal;
use std::path::{Path, PathBuf};

/// A shipping option offered at checkout
#[derive(Debug, Clone)]
pub struct ShippingMethod {
    pub id: String,
    pub name: String,
    pub cost: Decimal,
}

/// Configuration for the storefront data layer
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Directory holding the embedded database file
    pub data_dir: String,
    /// Tax rate applied to the order subtotal (e.g. 0.20 = 20%)
    pub tax_rate: Decimal,
    pub currency: String,
    pub shipping_methods: Vec<ShippingMethod>,
}

impl StoreConfig {
    pub fn from_env() -> Self {
        Self {
            data_dir: std::env::var("FLEUR_DATA_DIR").unwrap_or_else(|_| "/var/lib/fleur".into()),
            tax_rate: std::env::var("FLEUR_TAX_RATE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(|| Decimal::new(20, 2)),
            currency: std::env::var("FLEUR_CURRENCY").unwrap_or_else(|_| "EUR".into()),
            shipping_methods: Self::default_shipping_methods(),
        }
    }

    fn default_shipping_methods() -> Vec<ShippingMethod> {
        vec![
            ShippingMethod {
                id: "standard".to_string(),
                name: "Standard delivery".to_string(),
                cost: Decimal::new(790, 2),
            },
            ShippingMethod {
                id: "express".to_string(),
                name: "Express delivery".to_string(),
                cost: Decimal::new(1490, 2),
            },
            ShippingMethod {
                id: "pickup".to_string(),
                name: "Pickup in store".to_string(),
                cost: Decimal::ZERO,
            },
        ]
    }

    /// Look up a shipping method by id
    pub fn shipping_method(&self, id: &str) -> Option<&ShippingMethod> {
        self.shipping_methods.iter().find(|m| m.id == id)
    }

    /// Path of the embedded database file
    pub fn db_path(&self) -> PathBuf {
        Path::new(&self.data_dir).join("fleur.redb")
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
