//! Wishlist service

use crate::services::CatalogService;
use crate::store::KeyedStore;
use shared::models::{OwnerRef, WishlistEntry};
use shared::util::{now_millis, record_id};
use shared::AppResult;

#[derive(Clone)]
pub struct WishlistService {
    store: KeyedStore,
    catalog: CatalogService,
}

impl WishlistService {
    pub fn new(store: KeyedStore, catalog: CatalogService) -> Self {
        Self { store, catalog }
    }

    /// Wishlist entries for `owner`, oldest first.
    pub async fn entries(&self, owner: &OwnerRef) -> AppResult<Vec<WishlistEntry>> {
        let mut entries: Vec<WishlistEntry> =
            self.store.get_by_index("owner", &owner.key()).await?;
        entries.sort_by_key(|e| e.added_at);
        Ok(entries)
    }

    /// Add a product; adding an already-wished product returns the
    /// existing entry.
    pub async fn add(&self, owner: &OwnerRef, product_id: &str) -> AppResult<WishlistEntry> {
        self.catalog.product(product_id).await?;
        if let Some(existing) = self.find(owner, product_id).await? {
            return Ok(existing);
        }
        let entry = WishlistEntry {
            id: record_id(),
            owner: owner.clone(),
            product_id: product_id.to_string(),
            added_at: now_millis(),
        };
        self.store.put(&entry).await?;
        Ok(entry)
    }

    /// Remove a product from the wishlist; absent entries are a no-op.
    pub async fn remove(&self, owner: &OwnerRef, product_id: &str) -> AppResult<bool> {
        match self.find(owner, product_id).await? {
            Some(entry) => Ok(self.store.delete::<WishlistEntry>(&entry.id).await?),
            None => Ok(false),
        }
    }

    async fn find(
        &self,
        owner: &OwnerRef,
        product_id: &str,
    ) -> AppResult<Option<WishlistEntry>> {
        Ok(self
            .entries(owner)
            .await?
            .into_iter()
            .find(|e| e.product_id == product_id))
    }
}
