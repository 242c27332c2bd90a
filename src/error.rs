//! Coarse error classification shared by the service layers.

use std::fmt;

/// Caller-facing category of a service failure.
///
/// Outer layers (HTTP handlers, CLIs) map these to status codes or exit codes
/// without matching on component-specific error variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A referenced entity does not exist.
    NotFound,
    /// The entity is not in a status that permits the operation.
    InvalidState,
    /// The request was malformed or out of range.
    InvalidInput,
    /// The acting user lacks the required role or ownership.
    PermissionDenied,
    /// A concurrent writer changed the entity, or a uniqueness rule was hit.
    Conflict,
    /// Storage or infrastructure failure.
    Internal,
}

impl ErrorKind {
    /// Returns the canonical snake-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::InvalidState => "invalid_state",
            Self::InvalidInput => "invalid_input",
            Self::PermissionDenied => "permission_denied",
            Self::Conflict => "conflict",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}
