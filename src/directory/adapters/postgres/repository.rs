//! `PostgreSQL` directory adapter.

use super::{
    models::{OrganizationRow, UserRow},
    schema::{organizations, users},
};
use crate::directory::{
    domain::{Organization, OrganizationId, Role, User, UserId},
    ports::{DirectoryError, DirectoryResult, OrganizationDirectory, UserDirectory},
};
use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};

/// `PostgreSQL` connection pool type used by the directory adapter.
pub type DirectoryPgPool = Pool<ConnectionManager<PgConnection>>;

/// `PostgreSQL`-backed user and organization directory.
#[derive(Debug, Clone)]
pub struct PostgresDirectory {
    pool: DirectoryPgPool,
}

impl PostgresDirectory {
    /// Creates a new directory from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: DirectoryPgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, operation: F) -> DirectoryResult<T>
    where
        F: FnOnce(&mut PgConnection) -> DirectoryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(DirectoryError::persistence)?;
            operation(&mut connection)
        })
        .await
        .map_err(DirectoryError::persistence)?
    }
}

#[async_trait]
impl UserDirectory for PostgresDirectory {
    async fn find_user(&self, id: UserId) -> DirectoryResult<Option<User>> {
        self.run_blocking(move |connection| {
            let row = users::table
                .filter(users::id.eq(id.into_inner()))
                .filter(users::deleted_at.is_null())
                .select(UserRow::as_select())
                .first::<UserRow>(connection)
                .optional()
                .map_err(DirectoryError::persistence)?;
            row.map(row_to_user).transpose()
        })
        .await
    }

    async fn list_by_organization(&self, org_id: OrganizationId) -> DirectoryResult<Vec<User>> {
        self.run_blocking(move |connection| {
            let rows = users::table
                .filter(users::org_id.eq(org_id.into_inner()))
                .filter(users::deleted_at.is_null())
                .order((users::created_at.asc(), users::id.asc()))
                .select(UserRow::as_select())
                .load::<UserRow>(connection)
                .map_err(DirectoryError::persistence)?;
            rows.into_iter().map(row_to_user).collect()
        })
        .await
    }
}

#[async_trait]
impl OrganizationDirectory for PostgresDirectory {
    async fn find_organization(
        &self,
        id: OrganizationId,
    ) -> DirectoryResult<Option<Organization>> {
        self.run_blocking(move |connection| {
            let row = organizations::table
                .filter(organizations::id.eq(id.into_inner()))
                .filter(organizations::deleted_at.is_null())
                .select(OrganizationRow::as_select())
                .first::<OrganizationRow>(connection)
                .optional()
                .map_err(DirectoryError::persistence)?;
            row.map(row_to_organization).transpose()
        })
        .await
    }
}

fn row_to_user(row: UserRow) -> DirectoryResult<User> {
    let role = Role::try_from(row.role.as_str())
        .map_err(|err| DirectoryError::Corrupt(err.to_string()))?;
    User::new(
        UserId::from_uuid(row.id),
        row.display_name,
        role,
        row.org_id.map(OrganizationId::from_uuid),
    )
    .map_err(|err| DirectoryError::Corrupt(err.to_string()))
}

fn row_to_organization(row: OrganizationRow) -> DirectoryResult<Organization> {
    Organization::new(
        OrganizationId::from_uuid(row.id),
        row.name,
        row.parent_id.map(OrganizationId::from_uuid),
    )
    .map_err(|err| DirectoryError::Corrupt(err.to_string()))
}
