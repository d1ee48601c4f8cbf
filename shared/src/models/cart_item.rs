//! Cart item model

use super::actor::OwnerRef;
use serde::{Deserialize, Serialize};

/// One cart line: at most one per (owner, product) pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    pub id: String,
    pub owner: OwnerRef,
    /// Product reference (String ID)
    pub product_id: String,
    /// Always positive; a zero-quantity line is removed instead
    pub quantity: i64,
    pub added_at: i64,
    pub updated_at: i64,
}

/// Policy applied when an anonymous session authenticates and both an
/// anonymous and a saved cart exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MergePolicy {
    /// Union of both carts, summing quantities for shared products
    Merge,
    /// Discard the saved cart, keep the anonymous one
    KeepAnonymous,
    /// Discard the anonymous cart, keep the saved one
    KeepSaved,
}
