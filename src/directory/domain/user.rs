//! Directory view of a platform user.

use super::{Capability, DirectoryDomainError, OrganizationId, Role, UserId};
use serde::{Deserialize, Serialize};

/// User record as seen by the dispatcher and workflow engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    id: UserId,
    display_name: String,
    role: Role,
    org_id: Option<OrganizationId>,
}

impl User {
    /// Creates a user view.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryDomainError::EmptyDisplayName`] when the display
    /// name is blank.
    pub fn new(
        id: UserId,
        display_name: impl Into<String>,
        role: Role,
        org_id: Option<OrganizationId>,
    ) -> Result<Self, DirectoryDomainError> {
        let raw = display_name.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DirectoryDomainError::EmptyDisplayName);
        }
        Ok(Self {
            id,
            display_name: trimmed.to_owned(),
            role,
            org_id,
        })
    }

    /// Returns the user identifier.
    #[must_use]
    pub const fn id(&self) -> UserId {
        self.id
    }

    /// Returns the display name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Returns the role.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    /// Returns the owning organization, if any.
    #[must_use]
    pub const fn org_id(&self) -> Option<OrganizationId> {
        self.org_id
    }

    /// Returns whether the user's role grants `capability`.
    #[must_use]
    pub const fn can(&self, capability: Capability) -> bool {
        self.role.grants(capability)
    }
}
