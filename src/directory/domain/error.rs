//! Error types for directory value construction and parsing.

use thiserror::Error;

/// Errors returned while constructing directory values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DirectoryDomainError {
    /// The display name is empty after trimming.
    #[error("user display name must not be empty")]
    EmptyDisplayName,

    /// The organization name is empty after trimming.
    #[error("organization name must not be empty")]
    EmptyOrganizationName,
}

/// Error returned while parsing roles from persistence or requests.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown role: {0}")]
pub struct ParseRoleError(pub String);
