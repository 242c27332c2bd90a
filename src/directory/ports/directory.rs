//! Read-only lookup ports over directories owned elsewhere in the platform.

use crate::directory::domain::{Organization, OrganizationId, User, UserId};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for directory lookups.
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// User lookup contract.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Finds a user by identifier.
    ///
    /// Returns `None` when the user does not exist.
    async fn find_user(&self, id: UserId) -> DirectoryResult<Option<User>>;

    /// Lists the members of an organization in stable directory order.
    async fn list_by_organization(&self, org_id: OrganizationId) -> DirectoryResult<Vec<User>>;
}

/// Organization lookup contract.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrganizationDirectory: Send + Sync {
    /// Finds an organization by identifier.
    ///
    /// Returns `None` when the organization does not exist.
    async fn find_organization(&self, id: OrganizationId)
    -> DirectoryResult<Option<Organization>>;
}

/// Errors returned by directory adapters.
#[derive(Debug, Clone, Error)]
pub enum DirectoryError {
    /// A stored record could not be mapped to a domain value.
    #[error("corrupt directory record: {0}")]
    Corrupt(String),

    /// Persistence-layer failure.
    #[error("directory persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl DirectoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
