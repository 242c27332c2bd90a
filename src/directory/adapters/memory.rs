//! In-memory directory for tests and local runs.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::directory::{
    domain::{Organization, OrganizationId, User, UserId},
    ports::{DirectoryError, DirectoryResult, OrganizationDirectory, UserDirectory},
};

/// Thread-safe in-memory user and organization directory.
///
/// Members of an organization are listed in insertion order.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    state: Arc<RwLock<InMemoryDirectoryState>>,
}

#[derive(Debug, Default)]
struct InMemoryDirectoryState {
    users: Vec<User>,
    organizations: HashMap<OrganizationId, Organization>,
}

impl InMemoryDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a user.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Persistence`] when the state lock is poisoned.
    pub fn insert_user(&self, user: User) -> DirectoryResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        if let Some(existing) = state.users.iter_mut().find(|known| known.id() == user.id()) {
            *existing = user;
            return Ok(());
        }
        state.users.push(user);
        Ok(())
    }

    /// Adds or replaces an organization.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Persistence`] when the state lock is poisoned.
    pub fn insert_organization(&self, organization: Organization) -> DirectoryResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        state.organizations.insert(organization.id(), organization);
        Ok(())
    }
}

fn poisoned<T>(err: std::sync::PoisonError<T>) -> DirectoryError {
    DirectoryError::persistence(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl UserDirectory for InMemoryDirectory {
    async fn find_user(&self, id: UserId) -> DirectoryResult<Option<User>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.users.iter().find(|user| user.id() == id).cloned())
    }

    async fn list_by_organization(&self, org_id: OrganizationId) -> DirectoryResult<Vec<User>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state
            .users
            .iter()
            .filter(|user| user.org_id() == Some(org_id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl OrganizationDirectory for InMemoryDirectory {
    async fn find_organization(
        &self,
        id: OrganizationId,
    ) -> DirectoryResult<Option<Organization>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.organizations.get(&id).cloned())
    }
}
