//! Diesel row models for directory lookups.

use super::schema::{organizations, users};
use diesel::prelude::*;

/// Query result row for users.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserRow {
    /// User identifier.
    pub id: uuid::Uuid,
    /// Human-readable name.
    pub display_name: String,
    /// Role name.
    pub role: String,
    /// Owning organization.
    pub org_id: Option<uuid::Uuid>,
}

/// Query result row for organizations.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = organizations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrganizationRow {
    /// Organization identifier.
    pub id: uuid::Uuid,
    /// Organization name.
    pub name: String,
    /// Parent organization.
    pub parent_id: Option<uuid::Uuid>,
}
