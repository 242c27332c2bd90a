//! Directory view of an organization node.

use super::{DirectoryDomainError, OrganizationId};
use serde::{Deserialize, Serialize};

/// Organization in the root/province/city/district/street hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    id: OrganizationId,
    name: String,
    parent_id: Option<OrganizationId>,
}

impl Organization {
    /// Creates an organization view.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryDomainError::EmptyOrganizationName`] when the name
    /// is blank.
    pub fn new(
        id: OrganizationId,
        name: impl Into<String>,
        parent_id: Option<OrganizationId>,
    ) -> Result<Self, DirectoryDomainError> {
        let raw = name.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DirectoryDomainError::EmptyOrganizationName);
        }
        Ok(Self {
            id,
            name: trimmed.to_owned(),
            parent_id,
        })
    }

    /// Returns the organization identifier.
    #[must_use]
    pub const fn id(&self) -> OrganizationId {
        self.id
    }

    /// Returns the organization name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the parent organization, if this is not the root.
    #[must_use]
    pub const fn parent_id(&self) -> Option<OrganizationId> {
        self.parent_id
    }
}
