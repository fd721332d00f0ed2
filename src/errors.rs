use crate::store::StoreError;

/// Hard failures for creation/admin APIs. Soft ineligibility on the
/// checkout path is never an error; see `domain::promotion::ApplyOutcome`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Storage(#[from] StoreError),
}
