//! Domain model for directory lookups.

mod error;
mod ids;
mod organization;
mod role;
mod user;

pub use error::{DirectoryDomainError, ParseRoleError};
pub use ids::{OrganizationId, UserId};
pub use organization::Organization;
pub use role::{Capability, Role};
pub use user::User;
