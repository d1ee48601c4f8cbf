//! Cart service: per-owner cart lines and the login merge
//!
//! Carts are keyed by [`OwnerRef`], so anonymous sessions and logged-in
//! users use the same code paths. The login merge consumes the
//! anonymous cart, which makes a repeated merge a no-op.

use crate::services::CatalogService;
use crate::store::KeyedStore;
use shared::models::{CartItem, MergePolicy, OwnerRef, Product};
use shared::util::{now_millis, record_id};
use shared::{AppError, AppResult, ErrorCode};

#[derive(Clone)]
pub struct CartService {
    store: KeyedStore,
    catalog: CatalogService,
}

impl CartService {
    pub fn new(store: KeyedStore, catalog: CatalogService) -> Self {
        Self { store, catalog }
    }

    /// All cart lines for `owner`, oldest first.
    pub async fn items(&self, owner: &OwnerRef) -> AppResult<Vec<CartItem>> {
        let mut items: Vec<CartItem> = self.store.get_by_index("owner", &owner.key()).await?;
        items.sort_by_key(|i| i.added_at);
        Ok(items)
    }

    /// Add `quantity` of a product, folding into an existing line for
    /// the same product. The combined quantity is checked against
    /// stock.
    pub async fn add(
        &self,
        owner: &OwnerRef,
        product_id: &str,
        quantity: i64,
    ) -> AppResult<CartItem> {
        if quantity <= 0 {
            return Err(AppError::validation("quantity must be positive"));
        }
        let product = self.sellable_product(product_id).await?;

        let existing = self.find_line(owner, product_id).await?;
        let combined = existing.as_ref().map_or(0, |i| i.quantity) + quantity;
        if !product.has_stock_for(combined) {
            return Err(AppError::insufficient_stock(product_id)
                .with_detail("available", product.stock.unwrap_or(0))
                .with_detail("requested", combined));
        }

        match existing {
            Some(mut item) => {
                item.quantity = combined;
                item.updated_at = now_millis();
                self.store.update(&item).await?;
                Ok(item)
            }
            None => {
                let now = now_millis();
                let item = CartItem {
                    id: record_id(),
                    owner: owner.clone(),
                    product_id: product_id.to_string(),
                    quantity,
                    added_at: now,
                    updated_at: now,
                };
                self.store.put(&item).await?;
                Ok(item)
            }
        }
    }

    /// Set the absolute quantity of a cart line.
    pub async fn update_quantity(
        &self,
        owner: &OwnerRef,
        item_id: &str,
        quantity: i64,
    ) -> AppResult<CartItem> {
        if quantity <= 0 {
            return Err(AppError::invalid_request(
                "quantity must be positive; remove the line instead",
            ));
        }
        let mut item = self.owned_line(owner, item_id).await?;
        let product = self.sellable_product(&item.product_id).await?;
        if !product.has_stock_for(quantity) {
            return Err(AppError::insufficient_stock(&item.product_id)
                .with_detail("available", product.stock.unwrap_or(0))
                .with_detail("requested", quantity));
        }
        item.quantity = quantity;
        item.updated_at = now_millis();
        self.store.update(&item).await?;
        Ok(item)
    }

    /// Remove one cart line.
    pub async fn remove(&self, owner: &OwnerRef, item_id: &str) -> AppResult<()> {
        let item = self.owned_line(owner, item_id).await?;
        self.store.delete::<CartItem>(&item.id).await?;
        Ok(())
    }

    /// Remove every line owned by `owner`.
    pub async fn clear(&self, owner: &OwnerRef) -> AppResult<()> {
        for item in self.items(owner).await? {
            self.store.delete::<CartItem>(&item.id).await?;
        }
        Ok(())
    }

    /// Merge the anonymous cart into the user's saved cart on login.
    ///
    /// The anonymous cart is consumed in every policy, so calling this
    /// again with the same token is a no-op. Lines whose product has
    /// disappeared are dropped with a warning; merged quantities are
    /// capped to available stock.
    pub async fn merge_on_login(
        &self,
        anonymous: &OwnerRef,
        user: &OwnerRef,
        policy: MergePolicy,
    ) -> AppResult<Vec<CartItem>> {
        if !anonymous.is_anonymous() {
            return Err(AppError::invalid_request("merge source must be anonymous"));
        }
        if user.is_anonymous() {
            return Err(AppError::invalid_request(
                "merge target must be an authenticated user",
            ));
        }

        let anon_items = self.items(anonymous).await?;
        match policy {
            MergePolicy::KeepSaved => {
                for item in &anon_items {
                    self.store.delete::<CartItem>(&item.id).await?;
                }
            }
            MergePolicy::KeepAnonymous => {
                self.clear(user).await?;
                for item in anon_items {
                    self.transfer_line(item, user).await?;
                }
            }
            MergePolicy::Merge => {
                for item in anon_items {
                    self.merge_line(item, user).await?;
                }
            }
        }

        let merged = self.items(user).await?;
        tracing::info!(
            user = %user,
            policy = ?policy,
            lines = merged.len(),
            "cart merged on login"
        );
        Ok(merged)
    }

    /// Move one anonymous line to `user`, capping quantity to stock.
    async fn transfer_line(&self, mut item: CartItem, user: &OwnerRef) -> AppResult<()> {
        let Some(cap) = self.capped_quantity(&item.product_id, item.quantity).await? else {
            self.store.delete::<CartItem>(&item.id).await?;
            return Ok(());
        };
        item.quantity = cap;
        item.owner = user.clone();
        item.updated_at = now_millis();
        self.store.update(&item).await?;
        Ok(())
    }

    /// Fold one anonymous line into the user's cart, summing with any
    /// existing line for the same product.
    async fn merge_line(&self, item: CartItem, user: &OwnerRef) -> AppResult<()> {
        match self.find_line(user, &item.product_id).await? {
            Some(mut saved) => {
                let combined = saved.quantity + item.quantity;
                match self.capped_quantity(&item.product_id, combined).await? {
                    Some(cap) => {
                        saved.quantity = cap;
                        saved.updated_at = now_millis();
                        self.store.update(&saved).await?;
                    }
                    None => {
                        self.store.delete::<CartItem>(&saved.id).await?;
                    }
                }
                self.store.delete::<CartItem>(&item.id).await?;
                Ok(())
            }
            None => self.transfer_line(item, user).await,
        }
    }

    /// Quantity capped to available stock; `None` when the product is
    /// gone, inactive or out of stock (the line should be dropped).
    async fn capped_quantity(&self, product_id: &str, requested: i64) -> AppResult<Option<i64>> {
        let product = match self.catalog.find_product(product_id).await? {
            Some(p) if p.is_active => p,
            _ => {
                tracing::warn!(product_id, "dropping cart line for unavailable product");
                return Ok(None);
            }
        };
        let cap = match product.stock {
            None => requested,
            Some(stock) => requested.min(stock),
        };
        if cap <= 0 {
            tracing::warn!(product_id, "dropping cart line, product out of stock");
            return Ok(None);
        }
        Ok(Some(cap))
    }

    async fn sellable_product(&self, product_id: &str) -> AppResult<Product> {
        let product = self.catalog.product(product_id).await?;
        if !product.is_active {
            // Deactivated products are treated as gone for shoppers.
            return Err(AppError::new(ErrorCode::ProductNotFound).with_detail("id", product_id));
        }
        Ok(product)
    }

    async fn find_line(&self, owner: &OwnerRef, product_id: &str) -> AppResult<Option<CartItem>> {
        Ok(self
            .items(owner)
            .await?
            .into_iter()
            .find(|i| i.product_id == product_id))
    }

    async fn owned_line(&self, owner: &OwnerRef, item_id: &str) -> AppResult<CartItem> {
        let item = self
            .store
            .get::<CartItem>(item_id)
            .await?
            .ok_or_else(|| AppError::not_found("Cart item").with_detail("id", item_id))?;
        if item.owner != *owner {
            return Err(AppError::permission_denied("not the owner of this cart line"));
        }
        Ok(item)
    }
}
