//! Domain record models
//!
//! Every record carries a globally-unique `id` string used as the
//! primary key of its collection.

pub mod actor;
pub mod address;
pub mod cart_item;
pub mod category;
pub mod order;
pub mod product;
pub mod quote;
pub mod wishlist;

pub use actor::{Actor, OwnerRef, Role};
pub use address::{Address, AddressCreate, AddressUpdate};
pub use cart_item::{CartItem, MergePolicy};
pub use category::{Category, CategoryCreate, CategoryUpdate};
pub use order::{Order, OrderLine, OrderStatus, RefundRecord, StatusEntry, TrackingInfo};
pub use product::{Product, ProductCreate, ProductUpdate};
pub use quote::{
    ProposalLine, Quote, QuoteProposal, QuoteRequest, QuoteStatus, QuoteStatusEntry, QuoteType,
};
pub use wishlist::WishlistEntry;
