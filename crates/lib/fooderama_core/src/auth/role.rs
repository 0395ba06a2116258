//! Role hierarchy: `customer < manager < admin`.
//!
//! The order is linear. Any role string outside the three tiers grants
//! nothing.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Permission tier of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Lowest tier. `user` is accepted as an alias.
    #[serde(alias = "user")]
    Customer,
    Manager,
    Admin,
}

impl Role {
    /// Parse a stored or requested role name. `user` maps to `Customer`.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "customer" | "user" => Some(Role::Customer),
            "manager" => Some(Role::Manager),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Manager => "manager",
            Role::Admin => "admin",
        }
    }

    fn level(self) -> u8 {
        match self {
            Role::Customer => 1,
            Role::Manager => 2,
            Role::Admin => 3,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::parse(s).ok_or_else(|| format!("unrecognised role '{s}'"))
    }
}

/// Whether a user holding `user_role` may act at the `required` tier.
///
/// `None` stands for an unset or unrecognised role and is always denied.
pub fn permits(user_role: Option<Role>, required: Role) -> bool {
    match user_role {
        Some(role) => role.level() >= required.level(),
        None => false,
    }
}

/// Same decision for a raw role string.
pub fn permits_str(user_role: &str, required: Role) -> bool {
    permits(Role::parse(user_role), required)
}
