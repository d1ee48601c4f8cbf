//! Wishlist model

use super::actor::OwnerRef;
use serde::{Deserialize, Serialize};

/// One wishlist entry: at most one per (owner, product) pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WishlistEntry {
    pub id: String,
    pub owner: OwnerRef,
    /// Product reference (String ID)
    pub product_id: String,
    pub added_at: i64,
}
