//! Identifier types for directory entries.

use crate::ids::uuid_id;

uuid_id!(
    /// Unique identifier of a platform user (volunteer or staff).
    UserId
);

uuid_id!(
    /// Unique identifier of an organization in the hierarchy.
    OrganizationId
);
