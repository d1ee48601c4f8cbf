//! Order service: checkout and the order lifecycle
//!
//! Placement snapshots the cart into immutable order lines, decrements
//! stock through the catalog choke point and clears the cart. Every
//! later transition is validated by [`OrderStatus::can_transition_to`]
//! and appended to the order's status history.

use super::require_admin;
use crate::config::StoreConfig;
use crate::services::{CartService, CatalogService};
use crate::store::KeyedStore;
use rust_decimal::Decimal;
use shared::models::{
    Actor, Address, Order, OrderLine, OrderStatus, OwnerRef, RefundRecord, StatusEntry,
    TrackingInfo,
};
use shared::util::{now_millis, record_id, snowflake_id};
use shared::{AppError, AppResult, ErrorCode};

/// Two decimal places; amounts closer than this are considered equal.
const MONEY_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Checkout request
#[derive(Debug, Clone)]
pub struct PlaceOrderRequest {
    /// Shipping method id (from [`StoreConfig::shipping_methods`])
    pub shipping_method: String,
    pub shipping_address: Option<Address>,
    pub note: Option<String>,
}

#[derive(Clone)]
pub struct OrderService {
    store: KeyedStore,
    catalog: CatalogService,
    cart: CartService,
    config: StoreConfig,
}

impl OrderService {
    pub fn new(
        store: KeyedStore,
        catalog: CatalogService,
        cart: CartService,
        config: StoreConfig,
    ) -> Self {
        Self {
            store,
            catalog,
            cart,
            config,
        }
    }

    // ==================== Placement ====================

    /// Place an order from the actor's cart.
    ///
    /// Stock is decremented line by line; if any line fails, the
    /// decrements already applied are returned before the error
    /// propagates, so a failed checkout never leaks stock.
    pub async fn place_order(&self, actor: &Actor, request: PlaceOrderRequest) -> AppResult<Order> {
        let owner = actor.owner();
        let cart_items = self.cart.items(&owner).await?;
        if cart_items.is_empty() {
            return Err(AppError::new(ErrorCode::CartEmpty));
        }

        let method = self
            .config
            .shipping_method(&request.shipping_method)
            .ok_or_else(|| {
                AppError::new(ErrorCode::ShippingMethodUnknown)
                    .with_detail("shipping_method", request.shipping_method.clone())
            })?;

        let mut lines = Vec::with_capacity(cart_items.len());
        for item in &cart_items {
            let product = self.catalog.product(&item.product_id).await?;
            let line_subtotal = (product.price * Decimal::from(item.quantity)).round_dp(2);
            lines.push(OrderLine {
                product_id: product.id,
                name: product.name,
                unit_price: product.price,
                quantity: item.quantity,
                line_subtotal,
            });
        }

        self.take_stock(&lines).await?;

        let subtotal: Decimal = lines.iter().map(|l| l.line_subtotal).sum();
        let tax_amount = (subtotal * self.config.tax_rate).round_dp(2);
        let shipping_cost = method.cost;
        let total = subtotal + shipping_cost + tax_amount;

        let now = now_millis();
        let order = Order {
            id: record_id(),
            order_number: snowflake_id(),
            user_id: actor.id.clone(),
            items: lines,
            subtotal,
            shipping_cost,
            tax_amount,
            total,
            status: OrderStatus::Pending,
            status_history: vec![StatusEntry::new(
                OrderStatus::Pending,
                actor,
                request.note.or_else(|| Some("Order placed".to_string())),
            )],
            shipping_method: request.shipping_method,
            shipping_address: request.shipping_address,
            tracking: None,
            delivered_at: None,
            refund: None,
            created_at: now,
            updated_at: now,
        };

        if let Err(err) = self.store.put(&order).await {
            self.return_stock(&order.items).await;
            return Err(err.into());
        }
        // The order is committed; a cart that fails to clear must not
        // make checkout look failed.
        if let Err(err) = self.cart.clear(&owner).await {
            tracing::warn!(
                order_id = %order.id,
                error = %err,
                "failed to clear cart after placement"
            );
        }

        tracing::info!(
            order_id = %order.id,
            order_number = order.order_number,
            user_id = %order.user_id,
            total = %order.total,
            "order placed"
        );
        Ok(order)
    }

    // ==================== Transitions ====================

    /// Admin: Pending → Processing.
    pub async fn set_processing(&self, actor: &Actor, order_id: &str) -> AppResult<Order> {
        require_admin(actor)?;
        let mut order = self.load(order_id).await?;
        self.apply(&mut order, OrderStatus::Processing, actor, None)
            .await?;
        Ok(order)
    }

    /// Admin: mark shipped and attach tracking info.
    pub async fn mark_shipped(
        &self,
        actor: &Actor,
        order_id: &str,
        tracking: TrackingInfo,
    ) -> AppResult<Order> {
        require_admin(actor)?;
        let mut order = self.load(order_id).await?;
        require_transition(&order, OrderStatus::Shipped)?;
        order.tracking = Some(tracking);
        self.apply(&mut order, OrderStatus::Shipped, actor, None)
            .await?;
        Ok(order)
    }

    /// Admin: Shipped → Delivered, stamping `delivered_at`.
    pub async fn mark_delivered(&self, actor: &Actor, order_id: &str) -> AppResult<Order> {
        require_admin(actor)?;
        let mut order = self.load(order_id).await?;
        require_transition(&order, OrderStatus::Delivered)?;
        order.delivered_at = Some(now_millis());
        self.apply(&mut order, OrderStatus::Delivered, actor, None)
            .await?;
        Ok(order)
    }

    /// Owner or admin: cancel a not-yet-shipped order, returning line
    /// quantities to stock.
    pub async fn cancel(
        &self,
        actor: &Actor,
        order_id: &str,
        note: Option<String>,
    ) -> AppResult<Order> {
        let mut order = self.load_for(actor, order_id).await?;
        // Persist the transition first: status is the source of truth,
        // and stock return is best-effort, so a failed update leaves
        // stock untouched and a retry cannot restock twice.
        self.apply(&mut order, OrderStatus::Cancelled, actor, note)
            .await?;
        self.return_stock(&order.items).await;
        Ok(order)
    }

    /// Admin: reopen a cancelled order back to Processing, taking the
    /// line quantities from stock again.
    pub async fn reopen(&self, actor: &Actor, order_id: &str) -> AppResult<Order> {
        require_admin(actor)?;
        let mut order = self.load(order_id).await?;
        require_transition(&order, OrderStatus::Processing)?;
        self.take_stock(&order.items).await?;
        if let Err(err) = self
            .apply(&mut order, OrderStatus::Processing, actor, Some("Order reopened".to_string()))
            .await
        {
            self.return_stock(&order.items).await;
            return Err(err);
        }
        Ok(order)
    }

    /// Admin: refund up to the order total.
    ///
    /// A full refund (amount equals the total, within a cent) returns
    /// line quantities to stock; a partial refund never restocks.
    pub async fn refund(
        &self,
        actor: &Actor,
        order_id: &str,
        amount: Decimal,
        reason: Option<String>,
    ) -> AppResult<Order> {
        require_admin(actor)?;
        if amount <= Decimal::ZERO {
            return Err(AppError::validation("refund amount must be positive"));
        }
        let mut order = self.load(order_id).await?;
        require_transition(&order, OrderStatus::Refunded)?;
        if amount > order.total {
            return Err(AppError::new(ErrorCode::RefundExceedsTotal)
                .with_detail("amount", amount.to_string())
                .with_detail("total", order.total.to_string()));
        }

        let restocked = (order.total - amount).abs() <= MONEY_TOLERANCE;
        order.refund = Some(RefundRecord {
            amount,
            reason: reason.clone(),
            refunded_at: now_millis(),
            restocked,
        });
        // Same ordering as cancel: commit the transition, then return
        // stock best-effort.
        self.apply(&mut order, OrderStatus::Refunded, actor, reason)
            .await?;
        if restocked {
            self.return_stock(&order.items).await;
        }

        tracing::info!(
            order_id = %order.id,
            amount = %amount,
            restocked,
            "order refunded"
        );
        Ok(order)
    }

    // ==================== Queries ====================

    /// Fetch an order the actor may see.
    pub async fn get(&self, actor: &Actor, order_id: &str) -> AppResult<Order> {
        self.load_for(actor, order_id).await
    }

    /// Orders of one user, newest first. Customers may only list their
    /// own.
    pub async fn orders_for(&self, actor: &Actor, user_id: &str) -> AppResult<Vec<Order>> {
        if !actor.is_admin() && actor.id != user_id {
            return Err(AppError::permission_denied("cannot list another user's orders"));
        }
        let mut orders: Vec<Order> = self.store.get_by_index("user_id", user_id).await?;
        orders.sort_by_key(|o| std::cmp::Reverse(o.created_at));
        Ok(orders)
    }

    /// Admin: all orders, newest first.
    pub async fn all_orders(&self, actor: &Actor) -> AppResult<Vec<Order>> {
        require_admin(actor)?;
        let mut orders: Vec<Order> = self.store.get_all().await?;
        orders.sort_by_key(|o| std::cmp::Reverse(o.created_at));
        Ok(orders)
    }

    // ==================== Internals ====================

    async fn load(&self, order_id: &str) -> AppResult<Order> {
        self.store
            .get::<Order>(order_id)
            .await?
            .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound).with_detail("id", order_id))
    }

    async fn load_for(&self, actor: &Actor, order_id: &str) -> AppResult<Order> {
        let order = self.load(order_id).await?;
        let owner = OwnerRef::User(order.user_id.clone());
        if !actor.can_access(&owner) {
            return Err(AppError::permission_denied("not the owner of this order"));
        }
        Ok(order)
    }

    /// Validate, set and persist a status transition with its history
    /// entry.
    async fn apply(
        &self,
        order: &mut Order,
        next: OrderStatus,
        actor: &Actor,
        note: Option<String>,
    ) -> AppResult<()> {
        require_transition(order, next)?;
        order.status = next;
        order.status_history.push(StatusEntry::new(next, actor, note));
        order.updated_at = now_millis();
        self.store.update(order).await?;
        tracing::info!(order_id = %order.id, status = next.as_str(), "order transitioned");
        Ok(())
    }

    /// Decrement stock for every line, undoing prior decrements if one
    /// fails.
    async fn take_stock(&self, lines: &[OrderLine]) -> AppResult<()> {
        let mut taken: Vec<&OrderLine> = Vec::new();
        for line in lines {
            match self.catalog.adjust_stock(&line.product_id, -line.quantity).await {
                Ok(_) => taken.push(line),
                Err(err) => {
                    self.return_lines(&taken).await;
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    async fn return_stock(&self, lines: &[OrderLine]) {
        let all: Vec<&OrderLine> = lines.iter().collect();
        self.return_lines(&all).await;
    }

    /// Best-effort stock return; failures are logged, not propagated,
    /// so a cancel/refund never half-applies because of one line.
    async fn return_lines(&self, lines: &[&OrderLine]) {
        for line in lines {
            if let Err(err) = self.catalog.adjust_stock(&line.product_id, line.quantity).await {
                tracing::error!(
                    product_id = %line.product_id,
                    quantity = line.quantity,
                    error = %err,
                    "failed to return stock"
                );
            }
        }
    }
}

fn require_transition(order: &Order, next: OrderStatus) -> AppResult<()> {
    if !order.status.can_transition_to(next) {
        return Err(AppError::invalid_transition(
            order.status.as_str(),
            next.as_str(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{CategoryCreate, Product, ProductCreate, Role};

    struct Fixture {
        orders: OrderService,
        cart: CartService,
        catalog: CatalogService,
        admin: Actor,
        customer: Actor,
        category_id: String,
    }

    async fn setup() -> Fixture {
        let store = KeyedStore::open_in_memory().unwrap();
        let catalog = CatalogService::new(store.clone());
        let cart = CartService::new(store.clone(), catalog.clone());
        let orders = OrderService::new(
            store,
            catalog.clone(),
            cart.clone(),
            StoreConfig::from_env(),
        );
        let admin = Actor::new("a1", "Boss", Role::Admin);
        let customer = Actor::new("u1", "Ana", Role::Customer);
        let category = catalog
            .create_category(
                &admin,
                CategoryCreate {
                    name: "Bouquets".to_string(),
                    description: None,
                    sort_order: None,
                },
            )
            .await
            .unwrap();
        Fixture {
            orders,
            cart,
            catalog,
            admin,
            customer,
            category_id: category.id,
        }
    }

    impl Fixture {
        async fn product(&self, name: &str, price: Decimal, stock: Option<i64>) -> Product {
            self.catalog
                .create_product(
                    &self.admin,
                    ProductCreate {
                        name: name.to_string(),
                        description: None,
                        image: None,
                        category: self.category_id.clone(),
                        price,
                        stock,
                        sort_order: None,
                    },
                )
                .await
                .unwrap()
        }

        async fn place(&self, actor: &Actor) -> Order {
            self.orders
                .place_order(actor, standard_request())
                .await
                .unwrap()
        }
    }

    fn standard_request() -> PlaceOrderRequest {
        PlaceOrderRequest {
            shipping_method: "standard".to_string(),
            shipping_address: None,
            note: None,
        }
    }

    #[tokio::test]
    async fn test_place_order_totals_and_stock() {
        let fx = setup().await;
        let product = fx.product("Roses", Decimal::new(1000, 2), Some(5)).await;
        fx.cart
            .add(&fx.customer.owner(), &product.id, 2)
            .await
            .unwrap();

        let order = fx.place(&fx.customer).await;
        // 2 × 10.00 = 20.00, tax 20% = 4.00, standard shipping 7.90
        assert_eq!(order.subtotal, Decimal::new(2000, 2));
        assert_eq!(order.tax_amount, Decimal::new(400, 2));
        assert_eq!(order.shipping_cost, Decimal::new(790, 2));
        assert_eq!(order.total, Decimal::new(3190, 2));
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.status_history.len(), 1);

        let product = fx.catalog.product(&product.id).await.unwrap();
        assert_eq!(product.stock, Some(3));
        assert!(fx.cart.items(&fx.customer.owner()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_place_order_empty_cart() {
        let fx = setup().await;
        let err = fx
            .orders
            .place_order(&fx.customer, standard_request())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::CartEmpty);
    }

    #[tokio::test]
    async fn test_place_order_unknown_shipping_method() {
        let fx = setup().await;
        let product = fx.product("Roses", Decimal::new(1000, 2), Some(5)).await;
        fx.cart
            .add(&fx.customer.owner(), &product.id, 1)
            .await
            .unwrap();

        let err = fx
            .orders
            .place_order(
                &fx.customer,
                PlaceOrderRequest {
                    shipping_method: "drone".to_string(),
                    shipping_address: None,
                    note: None,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ShippingMethodUnknown);
    }

    #[tokio::test]
    async fn test_cancel_restocks_and_reopen_takes_again() {
        let fx = setup().await;
        let product = fx.product("Roses", Decimal::new(1000, 2), Some(5)).await;
        fx.cart
            .add(&fx.customer.owner(), &product.id, 2)
            .await
            .unwrap();
        let order = fx.place(&fx.customer).await;

        let cancelled = fx
            .orders
            .cancel(&fx.customer, &order.id, Some("changed my mind".to_string()))
            .await
            .unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(
            fx.catalog.product(&product.id).await.unwrap().stock,
            Some(5)
        );

        let reopened = fx.orders.reopen(&fx.admin, &order.id).await.unwrap();
        assert_eq!(reopened.status, OrderStatus::Processing);
        assert_eq!(
            fx.catalog.product(&product.id).await.unwrap().stock,
            Some(3)
        );
    }

    #[tokio::test]
    async fn test_cancel_after_ship_rejected() {
        let fx = setup().await;
        let product = fx.product("Roses", Decimal::new(1000, 2), Some(5)).await;
        fx.cart
            .add(&fx.customer.owner(), &product.id, 1)
            .await
            .unwrap();
        let order = fx.place(&fx.customer).await;

        fx.orders
            .mark_shipped(
                &fx.admin,
                &order.id,
                TrackingInfo {
                    carrier: "DHL".to_string(),
                    tracking_number: "X1".to_string(),
                },
            )
            .await
            .unwrap();

        let err = fx
            .orders
            .cancel(&fx.customer, &order.id, None)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidStatusTransition);
    }

    #[tokio::test]
    async fn test_customer_cannot_drive_admin_transitions() {
        let fx = setup().await;
        let product = fx.product("Roses", Decimal::new(1000, 2), Some(5)).await;
        fx.cart
            .add(&fx.customer.owner(), &product.id, 1)
            .await
            .unwrap();
        let order = fx.place(&fx.customer).await;

        let err = fx
            .orders
            .set_processing(&fx.customer, &order.id)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::AdminRequired);
    }

    #[tokio::test]
    async fn test_customer_cannot_read_foreign_order() {
        let fx = setup().await;
        let product = fx.product("Roses", Decimal::new(1000, 2), Some(5)).await;
        fx.cart
            .add(&fx.customer.owner(), &product.id, 1)
            .await
            .unwrap();
        let order = fx.place(&fx.customer).await;

        let other = Actor::new("u2", "Eve", Role::Customer);
        let err = fx.orders.get(&other, &order.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::PermissionDenied);

        let err = fx.orders.orders_for(&other, "u1").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::PermissionDenied);
    }

    #[tokio::test]
    async fn test_full_refund_restocks_partial_does_not() {
        let fx = setup().await;
        let product = fx.product("Roses", Decimal::new(1000, 2), Some(5)).await;
        fx.cart
            .add(&fx.customer.owner(), &product.id, 2)
            .await
            .unwrap();
        let order = fx.place(&fx.customer).await;

        // Partial refund keeps stock taken.
        let refunded = fx
            .orders
            .refund(&fx.admin, &order.id, Decimal::new(500, 2), None)
            .await
            .unwrap();
        let refund = refunded.refund.unwrap();
        assert!(!refund.restocked);
        assert_eq!(
            fx.catalog.product(&product.id).await.unwrap().stock,
            Some(3)
        );

        // Second order, full refund returns the units.
        fx.cart
            .add(&fx.customer.owner(), &product.id, 2)
            .await
            .unwrap();
        let order = fx.place(&fx.customer).await;
        let refunded = fx
            .orders
            .refund(&fx.admin, &order.id, order.total, None)
            .await
            .unwrap();
        assert!(refunded.refund.unwrap().restocked);
        assert_eq!(
            fx.catalog.product(&product.id).await.unwrap().stock,
            Some(3)
        );
    }

    #[tokio::test]
    async fn test_repeat_cancel_does_not_restock_twice() {
        let fx = setup().await;
        let product = fx.product("Roses", Decimal::new(1000, 2), Some(5)).await;
        fx.cart
            .add(&fx.customer.owner(), &product.id, 2)
            .await
            .unwrap();
        let order = fx.place(&fx.customer).await;

        fx.orders.cancel(&fx.customer, &order.id, None).await.unwrap();
        assert_eq!(
            fx.catalog.product(&product.id).await.unwrap().stock,
            Some(5)
        );

        // A retry after the transition is persisted must bounce off
        // the state machine before any stock movement.
        let err = fx
            .orders
            .cancel(&fx.customer, &order.id, None)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidStatusTransition);
        assert_eq!(
            fx.catalog.product(&product.id).await.unwrap().stock,
            Some(5)
        );
    }

    #[tokio::test]
    async fn test_refund_one_cent_over_total_rejected() {
        let fx = setup().await;
        let product = fx.product("Roses", Decimal::new(1000, 2), Some(5)).await;
        fx.cart
            .add(&fx.customer.owner(), &product.id, 1)
            .await
            .unwrap();
        let order = fx.place(&fx.customer).await;

        let err = fx
            .orders
            .refund(
                &fx.admin,
                &order.id,
                order.total + Decimal::new(1, 2),
                None,
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::RefundExceedsTotal);
        assert_eq!(
            fx.catalog.product(&product.id).await.unwrap().stock,
            Some(4)
        );
    }

    #[tokio::test]
    async fn test_refund_exceeding_total_rejected() {
        let fx = setup().await;
        let product = fx.product("Roses", Decimal::new(1000, 2), Some(5)).await;
        fx.cart
            .add(&fx.customer.owner(), &product.id, 1)
            .await
            .unwrap();
        let order = fx.place(&fx.customer).await;

        let err = fx
            .orders
            .refund(&fx.admin, &order.id, order.total + Decimal::ONE, None)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::RefundExceedsTotal);
    }

    #[tokio::test]
    async fn test_history_is_append_only() {
        let fx = setup().await;
        let product = fx.product("Roses", Decimal::new(1000, 2), Some(5)).await;
        fx.cart
            .add(&fx.customer.owner(), &product.id, 1)
            .await
            .unwrap();
        let order = fx.place(&fx.customer).await;

        fx.orders.set_processing(&fx.admin, &order.id).await.unwrap();
        fx.orders
            .mark_shipped(
                &fx.admin,
                &order.id,
                TrackingInfo {
                    carrier: "DHL".to_string(),
                    tracking_number: "X1".to_string(),
                },
            )
            .await
            .unwrap();
        let delivered = fx.orders.mark_delivered(&fx.admin, &order.id).await.unwrap();

        let statuses: Vec<OrderStatus> =
            delivered.status_history.iter().map(|e| e.status).collect();
        assert_eq!(
            statuses,
            vec![
                OrderStatus::Pending,
                OrderStatus::Processing,
                OrderStatus::Shipped,
                OrderStatus::Delivered,
            ]
        );
        assert_eq!(delivered.status, OrderStatus::Delivered);
        assert!(delivered.delivered_at.is_some());
    }
}
