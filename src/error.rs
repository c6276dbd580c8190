use thiserror::Error;

/// Errors the geometric core can surface.
///
/// Degenerate directions, non-positive dimensions and rotations requested
/// before any pose exists are not errors: they resolve to fallbacks
/// (unit +Z, 0.01 radius floor, silent no-op).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlannerError {
    #[error("point '{label}' not found")]
    NotFound { label: String },
}

impl PlannerError {
    pub fn not_found(label: impl Into<String>) -> Self {
        PlannerError::NotFound {
            label: label.into(),
        }
    }
}
