//! Closed role set and the capabilities each role grants.

use super::ParseRoleError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Platform role held by a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Unrestricted platform operator.
    SuperAdmin,
    /// Organization administrator.
    Admin,
    /// Coordinator who dispatches and supervises field work.
    Manager,
    /// Field volunteer.
    Volunteer,
}

/// Privilege checked by services before mutating shared records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Cancel or delete records created by someone else.
    Administer,
    /// Reassign or complete work held by someone else.
    Manage,
}

impl Role {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SuperAdmin => "super_admin",
            Self::Admin => "admin",
            Self::Manager => "manager",
            Self::Volunteer => "volunteer",
        }
    }

    /// Returns whether this role grants `capability`.
    #[must_use]
    pub const fn grants(self, capability: Capability) -> bool {
        match capability {
            Capability::Administer => matches!(self, Self::SuperAdmin | Self::Admin),
            Capability::Manage => matches!(self, Self::SuperAdmin | Self::Admin | Self::Manager),
        }
    }

    /// Returns whether the role carries administrator privileges.
    #[must_use]
    pub const fn is_admin(self) -> bool {
        self.grants(Capability::Administer)
    }

    /// Returns whether the role carries manager privileges.
    #[must_use]
    pub const fn is_manager(self) -> bool {
        self.grants(Capability::Manage)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Role {
    type Error = ParseRoleError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "super_admin" => Ok(Self::SuperAdmin),
            "admin" => Ok(Self::Admin),
            "manager" => Ok(Self::Manager),
            "volunteer" => Ok(Self::Volunteer),
            _ => Err(ParseRoleError(value.to_owned())),
        }
    }
}
