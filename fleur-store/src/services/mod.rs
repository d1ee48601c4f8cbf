//! Domain services
//!
//! Services own authorization, validation and side effects; the state
//! machines on the status enums only answer whether a transition is
//! admissible.

mod address;
mod cart;
mod catalog;
mod orders;
mod quotes;
mod wishlist;

pub use address::AddressService;
pub use cart::CartService;
pub use catalog::CatalogService;
pub use orders::{OrderService, PlaceOrderRequest};
pub use quotes::QuoteService;
pub use wishlist::WishlistService;

use shared::models::Actor;
use shared::{AppError, AppResult};

pub(crate) fn require_admin(actor: &Actor) -> AppResult<()> {
    if !actor.is_admin() {
        return Err(AppError::admin_required());
    }
    Ok(())
}
