//! Shared types for the Fleur storefront
//!
//! Common types used across crates: domain record models, the unified
//! error system, actor/ownership types, and small utilities.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use error::{AppError, AppResult, ErrorCode};
pub use serde::{Deserialize, Serialize};
