//! Unified error codes for the Fleur storefront
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 4xxx: Order errors
//! - 5xxx: Quote errors
//! - 6xxx: Catalog/stock errors
//! - 9xxx: System/storage errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient
/// serialization and cross-language compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Insert with an already-existing primary key
    DuplicateKey = 4,
    /// Invalid request
    InvalidRequest = 5,

    // ==================== 1xxx: Auth ====================
    /// Caller is not authenticated
    NotAuthenticated = 1001,
    /// Session has expired
    SessionExpired = 1002,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,
    /// Admin role required
    AdminRequired = 2002,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Requested status change is not reachable from the current status
    InvalidStatusTransition = 4002,
    /// Cart is empty, order cannot be placed
    CartEmpty = 4003,
    /// Refund amount exceeds order total
    RefundExceedsTotal = 4004,
    /// Unknown shipping method
    ShippingMethodUnknown = 4005,

    // ==================== 5xxx: Quote ====================
    /// Quote not found
    QuoteNotFound = 5001,
    /// Quote proposal has expired
    QuoteExpired = 5002,
    /// Quote has no proposal attached
    ProposalMissing = 5003,

    // ==================== 6xxx: Catalog ====================
    /// Product not found
    ProductNotFound = 6001,
    /// Stock-decrementing operation would drive stock negative
    InsufficientStock = 6002,
    /// Category not found
    CategoryNotFound = 6003,
    /// Category name already taken (case-insensitive)
    CategoryNameTaken = 6004,

    // ==================== 9xxx: System ====================
    /// Internal error
    InternalError = 9001,
    /// Record serialization failed
    SerializationError = 9002,
    /// Underlying store unreachable or out of quota
    StorageUnavailable = 9401,
}

impl ErrorCode {
    /// Numeric code value
    pub fn code(&self) -> u16 {
        *self as u16
    }

    /// Default human-readable message for this code
    pub fn message(&self) -> &'static str {
        match self {
            Self::Success => "OK",
            Self::Unknown => "Unknown error",
            Self::ValidationFailed => "Validation failed",
            Self::NotFound => "Resource not found",
            Self::DuplicateKey => "Resource already exists",
            Self::InvalidRequest => "Invalid request",
            Self::NotAuthenticated => "Please login first",
            Self::SessionExpired => "Session expired",
            Self::PermissionDenied => "Permission denied",
            Self::AdminRequired => "Admin role required",
            Self::OrderNotFound => "Order not found",
            Self::InvalidStatusTransition => "Invalid status transition",
            Self::CartEmpty => "Cart is empty",
            Self::RefundExceedsTotal => "Refund amount exceeds order total",
            Self::ShippingMethodUnknown => "Unknown shipping method",
            Self::QuoteNotFound => "Quote not found",
            Self::QuoteExpired => "Quote proposal has expired",
            Self::ProposalMissing => "Quote has no proposal",
            Self::ProductNotFound => "Product not found",
            Self::InsufficientStock => "Insufficient stock",
            Self::CategoryNotFound => "Category not found",
            Self::CategoryNameTaken => "Category name already taken",
            Self::InternalError => "Internal error",
            Self::SerializationError => "Serialization error",
            Self::StorageUnavailable => "Storage unavailable",
        }
    }

}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl From<ErrorCode> for u16 {
    fn from(code: ErrorCode) -> u16 {
        code.code()
    }
}

/// Error returned when converting an unknown u16 into an [`ErrorCode`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        let code = match value {
            0 => Self::Success,
            1 => Self::Unknown,
            2 => Self::ValidationFailed,
            3 => Self::NotFound,
            4 => Self::DuplicateKey,
            5 => Self::InvalidRequest,
            1001 => Self::NotAuthenticated,
            1002 => Self::SessionExpired,
            2001 => Self::PermissionDenied,
            2002 => Self::AdminRequired,
            4001 => Self::OrderNotFound,
            4002 => Self::InvalidStatusTransition,
            4003 => Self::CartEmpty,
            4004 => Self::RefundExceedsTotal,
            4005 => Self::ShippingMethodUnknown,
            5001 => Self::QuoteNotFound,
            5002 => Self::QuoteExpired,
            5003 => Self::ProposalMissing,
            6001 => Self::ProductNotFound,
            6002 => Self::InsufficientStock,
            6003 => Self::CategoryNotFound,
            6004 => Self::CategoryNameTaken,
            9001 => Self::InternalError,
            9002 => Self::SerializationError,
            9401 => Self::StorageUnavailable,
            other => return Err(InvalidErrorCode(other)),
        };
        Ok(code)
    }
}
