//! Port contracts for the user and organization directories.

mod directory;

pub use directory::{DirectoryError, DirectoryResult, OrganizationDirectory, UserDirectory};
#[cfg(test)]
pub use directory::{MockOrganizationDirectory, MockUserDirectory};
