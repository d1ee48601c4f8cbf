//! Actor and ownership types
//!
//! Every domain call takes an explicit actor (or owner) parameter;
//! there is no ambient session global.

use serde::{Deserialize, Serialize};

/// Role of an authenticated actor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Customer,
    Admin,
}

/// Authenticated actor performing a domain operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// User id (String ID)
    pub id: String,
    /// Display name snapshot
    pub name: String,
    pub role: Role,
}

impl Actor {
    pub fn new(id: impl Into<String>, name: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// The owner reference for records belonging to this actor
    pub fn owner(&self) -> OwnerRef {
        OwnerRef::User(self.id.clone())
    }

    /// Whether this actor may read/mutate records owned by `owner`
    pub fn can_access(&self, owner: &OwnerRef) -> bool {
        if self.is_admin() {
            return true;
        }
        matches!(owner, OwnerRef::User(id) if *id == self.id)
    }
}

/// Owner of a cart/wishlist record: an authenticated user or an
/// anonymous session token issued before login.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OwnerRef {
    User(String),
    Anonymous(String),
}

impl OwnerRef {
    /// Stable string form, used as secondary-index value
    pub fn key(&self) -> String {
        match self {
            Self::User(id) => format!("user:{}", id),
            Self::Anonymous(token) => format!("anon:{}", token),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous(_))
    }
}

impl std::fmt::Display for OwnerRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}
