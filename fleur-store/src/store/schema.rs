//! Collection schema: `Record` implementations and table creation
//!
//! | Collection | Index field | Index table |
//! |------------|-------------|-------------|
//! | `products` | `category` | `products.by_category` |
//! | `categories` | `name_key` | `categories.by_name` |
//! | `cart_items` | `owner` | `cart_items.by_owner` |
//! | `orders` | `user_id` | `orders.by_user` |
//! | `quotes` | `user_id` | `quotes.by_user` |
//! | `wishlist` | `owner` | `wishlist.by_owner` |
//! | `addresses` | `user_id` | `addresses.by_user` |

use super::{IndexSpec, Record, StoreResult, data_table, index_table};
use redb::WriteTransaction;
use shared::models::{Address, CartItem, Category, Order, Product, Quote, WishlistEntry};

impl Record for Product {
    const COLLECTION: &'static str = "products";
    const INDEXES: &'static [IndexSpec] = &[IndexSpec {
        field: "category",
        table: "products.by_category",
    }];

    fn id(&self) -> &str {
        &self.id
    }

    fn index_value(&self, field: &str) -> Option<String> {
        match field {
            "category" => Some(self.category.clone()),
            _ => None,
        }
    }
}

impl Record for Category {
    const COLLECTION: &'static str = "categories";
    const INDEXES: &'static [IndexSpec] = &[IndexSpec {
        field: "name_key",
        table: "categories.by_name",
    }];

    fn id(&self) -> &str {
        &self.id
    }

    fn index_value(&self, field: &str) -> Option<String> {
        match field {
            "name_key" => Some(self.name_key.clone()),
            _ => None,
        }
    }
}

impl Record for CartItem {
    const COLLECTION: &'static str = "cart_items";
    const INDEXES: &'static [IndexSpec] = &[IndexSpec {
        field: "owner",
        table: "cart_items.by_owner",
    }];

    fn id(&self) -> &str {
        &self.id
    }

    fn index_value(&self, field: &str) -> Option<String> {
        match field {
            "owner" => Some(self.owner.key()),
            _ => None,
        }
    }
}

impl Record for Order {
    const COLLECTION: &'static str = "orders";
    const INDEXES: &'static [IndexSpec] = &[IndexSpec {
        field: "user_id",
        table: "orders.by_user",
    }];

    fn id(&self) -> &str {
        &self.id
    }

    fn index_value(&self, field: &str) -> Option<String> {
        match field {
            "user_id" => Some(self.user_id.clone()),
            _ => None,
        }
    }
}

impl Record for Quote {
    const COLLECTION: &'static str = "quotes";
    const INDEXES: &'static [IndexSpec] = &[IndexSpec {
        field: "user_id",
        table: "quotes.by_user",
    }];

    fn id(&self) -> &str {
        &self.id
    }

    fn index_value(&self, field: &str) -> Option<String> {
        match field {
            "user_id" => Some(self.user_id.clone()),
            _ => None,
        }
    }
}

impl Record for WishlistEntry {
    const COLLECTION: &'static str = "wishlist";
    const INDEXES: &'static [IndexSpec] = &[IndexSpec {
        field: "owner",
        table: "wishlist.by_owner",
    }];

    fn id(&self) -> &str {
        &self.id
    }

    fn index_value(&self, field: &str) -> Option<String> {
        match field {
            "owner" => Some(self.owner.key()),
            _ => None,
        }
    }
}

impl Record for Address {
    const COLLECTION: &'static str = "addresses";
    const INDEXES: &'static [IndexSpec] = &[IndexSpec {
        field: "user_id",
        table: "addresses.by_user",
    }];

    fn id(&self) -> &str {
        &self.id
    }

    fn index_value(&self, field: &str) -> Option<String> {
        match field {
            "user_id" => Some(self.user_id.clone()),
            _ => None,
        }
    }
}

/// Create every data and index table if absent.
pub(super) fn create_tables(write_txn: &WriteTransaction) -> StoreResult<()> {
    ensure::<Product>(write_txn)?;
    ensure::<Category>(write_txn)?;
    ensure::<CartItem>(write_txn)?;
    ensure::<Order>(write_txn)?;
    ensure::<Quote>(write_txn)?;
    ensure::<WishlistEntry>(write_txn)?;
    ensure::<Address>(write_txn)?;
    Ok(())
}

fn ensure<R: Record>(write_txn: &WriteTransaction) -> StoreResult<()> {
    let _ = write_txn.open_table(data_table::<R>())?;
    for spec in R::INDEXES {
        let _ = write_txn.open_table(index_table(spec))?;
    }
    Ok(())
}
