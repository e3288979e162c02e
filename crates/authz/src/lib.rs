//! Authentication and authorization primitives: roles, bearer tokens,
//! password hashes, and the extractors handlers use as guards.

pub mod guard;
pub mod password;
pub mod token;

pub use guard::{AdminPrincipal, Principal};
pub use token::{Claims, JwtKeys};

use serde::{Deserialize, Serialize};

/// Roles a user can hold. `Admin` implies `User`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "ROLE_USER")]
    User,
    #[serde(rename = "ROLE_ADMIN")]
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "ROLE_USER",
            Role::Admin => "ROLE_ADMIN",
        }
    }

    /// Whether holding `self` grants `required`
    pub fn grants(&self, required: Role) -> bool {
        match self {
            Role::Admin => true,
            Role::User => required == Role::User,
        }
    }
}
