//! Normalisation helpers for free-text fields.

use super::WorkflowDomainError;

pub(super) fn require_text(
    field: &'static str,
    value: impl Into<String>,
) -> Result<String, WorkflowDomainError> {
    let raw = value.into();
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(WorkflowDomainError::EmptyField(field));
    }
    Ok(trimmed.to_owned())
}

pub(super) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_owned())
        .filter(|text| !text.is_empty())
}
