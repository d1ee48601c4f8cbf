//! Catalog service: products, categories and the stock choke point
//!
//! `adjust_stock` is the only code path that mutates `Product::stock`;
//! cart, order and merge logic all go through it.

use super::require_admin;
use crate::store::KeyedStore;
use shared::models::{
    Actor, Category, CategoryCreate, CategoryUpdate, Product, ProductCreate, ProductUpdate,
};
use shared::util::{now_millis, record_id};
use shared::{AppError, AppResult, ErrorCode};

#[derive(Clone)]
pub struct CatalogService {
    store: KeyedStore,
}

impl CatalogService {
    pub fn new(store: KeyedStore) -> Self {
        Self { store }
    }

    // ==================== Products ====================

    /// Fetch a product by id, error if absent.
    pub async fn product(&self, id: &str) -> AppResult<Product> {
        self.store
            .get::<Product>(id)
            .await?
            .ok_or_else(|| AppError::new(ErrorCode::ProductNotFound).with_detail("id", id))
    }

    /// Fetch a product by id, `None` if absent.
    pub async fn find_product(&self, id: &str) -> AppResult<Option<Product>> {
        Ok(self.store.get(id).await?)
    }

    /// Active products in a category, sorted by `sort_order` then name.
    pub async fn products_by_category(&self, category_id: &str) -> AppResult<Vec<Product>> {
        let mut products: Vec<Product> =
            self.store.get_by_index("category", category_id).await?;
        products.retain(|p| p.is_active);
        products.sort_by(|a, b| (a.sort_order, &a.name).cmp(&(b.sort_order, &b.name)));
        Ok(products)
    }

    /// All products including inactive ones (admin listing).
    pub async fn all_products(&self, actor: &Actor) -> AppResult<Vec<Product>> {
        require_admin(actor)?;
        let mut products: Vec<Product> = self.store.get_all().await?;
        products.sort_by(|a, b| (a.sort_order, &a.name).cmp(&(b.sort_order, &b.name)));
        Ok(products)
    }

    pub async fn create_product(
        &self,
        actor: &Actor,
        payload: ProductCreate,
    ) -> AppResult<Product> {
        require_admin(actor)?;
        validate_price(payload.price)?;
        validate_stock(payload.stock)?;
        if payload.name.trim().is_empty() {
            return Err(AppError::validation("product name must not be empty"));
        }
        self.category(&payload.category).await?;

        let now = now_millis();
        let product = Product {
            id: record_id(),
            name: payload.name,
            description: payload.description,
            image: payload.image,
            category: payload.category,
            price: payload.price,
            stock: payload.stock,
            sort_order: payload.sort_order.unwrap_or(0),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.store.put(&product).await?;
        tracing::info!(product_id = %product.id, name = %product.name, "product created");
        Ok(product)
    }

    pub async fn update_product(
        &self,
        actor: &Actor,
        id: &str,
        payload: ProductUpdate,
    ) -> AppResult<Product> {
        require_admin(actor)?;
        let mut product = self.product(id).await?;

        if let Some(name) = payload.name {
            if name.trim().is_empty() {
                return Err(AppError::validation("product name must not be empty"));
            }
            product.name = name;
        }
        if let Some(description) = payload.description {
            product.description = Some(description);
        }
        if let Some(image) = payload.image {
            product.image = Some(image);
        }
        if let Some(category) = payload.category {
            self.category(&category).await?;
            product.category = category;
        }
        if let Some(price) = payload.price {
            validate_price(price)?;
            product.price = price;
        }
        if let Some(stock) = payload.stock {
            validate_stock(stock)?;
            product.stock = stock;
        }
        if let Some(sort_order) = payload.sort_order {
            product.sort_order = sort_order;
        }
        if let Some(is_active) = payload.is_active {
            product.is_active = is_active;
        }
        product.updated_at = now_millis();

        self.store.update(&product).await?;
        Ok(product)
    }

    pub async fn delete_product(&self, actor: &Actor, id: &str) -> AppResult<bool> {
        require_admin(actor)?;
        Ok(self.store.delete::<Product>(id).await?)
    }

    /// Adjust tracked stock by `delta` (negative to take, positive to
    /// return). Untracked stock (`None`) passes through unchanged.
    ///
    /// This is the single read-modify-write for stock; callers doing
    /// multi-product sequences compensate with the inverse delta on
    /// failure.
    pub async fn adjust_stock(&self, product_id: &str, delta: i64) -> AppResult<Product> {
        let mut product = self.product(product_id).await?;
        let Some(stock) = product.stock else {
            return Ok(product);
        };
        let next = stock + delta;
        if next < 0 {
            return Err(AppError::insufficient_stock(product_id)
                .with_detail("available", stock)
                .with_detail("requested", -delta));
        }
        product.stock = Some(next);
        product.updated_at = now_millis();
        self.store.update(&product).await?;
        tracing::debug!(product_id, delta, stock = next, "stock adjusted");
        Ok(product)
    }

    // ==================== Categories ====================

    pub async fn category(&self, id: &str) -> AppResult<Category> {
        self.store
            .get::<Category>(id)
            .await?
            .ok_or_else(|| AppError::new(ErrorCode::CategoryNotFound).with_detail("id", id))
    }

    /// Active categories sorted by `sort_order` then name.
    pub async fn categories(&self) -> AppResult<Vec<Category>> {
        let mut categories: Vec<Category> = self.store.get_all().await?;
        categories.retain(|c| c.is_active);
        categories.sort_by(|a, b| (a.sort_order, &a.name).cmp(&(b.sort_order, &b.name)));
        Ok(categories)
    }

    pub async fn create_category(
        &self,
        actor: &Actor,
        payload: CategoryCreate,
    ) -> AppResult<Category> {
        require_admin(actor)?;
        let name = payload.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::validation("category name must not be empty"));
        }
        let name_key = name.to_lowercase();
        self.ensure_name_free(&name_key, None).await?;

        let category = Category {
            id: record_id(),
            name,
            name_key,
            description: payload.description,
            sort_order: payload.sort_order.unwrap_or(0),
            is_active: true,
        };
        self.store.put(&category).await?;
        tracing::info!(category_id = %category.id, name = %category.name, "category created");
        Ok(category)
    }

    pub async fn update_category(
        &self,
        actor: &Actor,
        id: &str,
        payload: CategoryUpdate,
    ) -> AppResult<Category> {
        require_admin(actor)?;
        let mut category = self.category(id).await?;

        if let Some(name) = payload.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(AppError::validation("category name must not be empty"));
            }
            let name_key = name.to_lowercase();
            if name_key != category.name_key {
                self.ensure_name_free(&name_key, Some(id)).await?;
            }
            category.name = name;
            category.name_key = name_key;
        }
        if let Some(description) = payload.description {
            category.description = Some(description);
        }
        if let Some(sort_order) = payload.sort_order {
            category.sort_order = sort_order;
        }
        if let Some(is_active) = payload.is_active {
            category.is_active = is_active;
        }

        self.store.update(&category).await?;
        Ok(category)
    }

    /// Case-insensitive name uniqueness via the `name_key` index.
    async fn ensure_name_free(&self, name_key: &str, except_id: Option<&str>) -> AppResult<()> {
        let existing: Vec<Category> = self.store.get_by_index("name_key", name_key).await?;
        if existing.iter().any(|c| Some(c.id.as_str()) != except_id) {
            return Err(
                AppError::new(ErrorCode::CategoryNameTaken).with_detail("name_key", name_key)
            );
        }
        Ok(())
    }
}

fn validate_price(price: rust_decimal::Decimal) -> AppResult<()> {
    if price.is_sign_negative() {
        return Err(AppError::validation("price must not be negative"));
    }
    Ok(())
}

fn validate_stock(stock: Option<i64>) -> AppResult<()> {
    if let Some(stock) = stock {
        if stock < 0 {
            return Err(AppError::validation("stock must not be negative"));
        }
    }
    Ok(())
}
