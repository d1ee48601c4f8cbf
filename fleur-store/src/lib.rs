//! Fleur storefront: embedded persistence and order lifecycle
//!
//! The crate bundles a redb-backed keyed collection store with the
//! domain services of a flower-shop storefront: catalog and stock,
//! per-owner carts with a login merge, the order state machine and the
//! bespoke-work quote flow.
//!
//! # Usage
//!
//! ```no_run
//! use fleur_store::{Storefront, StoreConfig};
//!
//! # fn main() -> shared::AppResult<()> {
//! let shop = Storefront::open(StoreConfig::from_env())?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod services;
pub mod session;
pub mod store;

pub use config::{ShippingMethod, StoreConfig};
pub use services::{
    AddressService, CartService, CatalogService, OrderService, PlaceOrderRequest, QuoteService,
    WishlistService,
};
pub use session::{IdentityProvider, SessionManager};
pub use store::{IndexSpec, KeyedStore, Record, StoreError, StoreResult};

use shared::AppResult;

/// The assembled storefront: one store, all services.
#[derive(Clone)]
pub struct Storefront {
    pub catalog: CatalogService,
    pub cart: CartService,
    pub orders: OrderService,
    pub quotes: QuoteService,
    pub wishlist: WishlistService,
    pub addresses: AddressService,
    pub session: SessionManager,
    pub config: StoreConfig,
}

impl Storefront {
    /// Open the storefront against the configured database file.
    pub fn open(config: StoreConfig) -> AppResult<Self> {
        let store = KeyedStore::open(config.db_path())?;
        Ok(Self::assemble(store, config))
    }

    /// Open an ephemeral storefront (tests, previews). Contents are
    /// lost on drop.
    pub fn open_in_memory(config: StoreConfig) -> AppResult<Self> {
        let store = KeyedStore::open_in_memory()?;
        Ok(Self::assemble(store, config))
    }

    fn assemble(store: KeyedStore, config: StoreConfig) -> Self {
        let catalog = CatalogService::new(store.clone());
        let cart = CartService::new(store.clone(), catalog.clone());
        let orders = OrderService::new(
            store.clone(),
            catalog.clone(),
            cart.clone(),
            config.clone(),
        );
        let quotes = QuoteService::new(store.clone());
        let wishlist = WishlistService::new(store.clone(), catalog.clone());
        let addresses = AddressService::new(store);
        Self {
            catalog,
            cart,
            orders,
            quotes,
            wishlist,
            addresses,
            session: SessionManager::new(),
            config,
        }
    }
}
