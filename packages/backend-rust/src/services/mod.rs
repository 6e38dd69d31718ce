pub mod attempt_stats;
pub mod catalog;
pub mod learning_path;
pub mod review;

use crate::ids::IdError;
use crate::store::StoreError;

pub use attempt_stats::{AttemptService, AttemptStats};
pub use catalog::{CatalogReport, CatalogService};
pub use learning_path::{
    CompleteStepInput, CompleteStepResult, CurrentStep, LearningPathService, PathStep, PathView,
    StartStepResult,
};
pub use review::{PracticeItem, PracticeSource, ReviewService};

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("storage conflict: {0}")]
    StorageConflict(String),
    #[error(transparent)]
    Storage(StoreError),
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(message) => EngineError::StorageConflict(message),
            StoreError::Sqlx(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                EngineError::StorageConflict(db.message().to_string())
            }
            other => EngineError::Storage(other),
        }
    }
}

impl From<IdError> for EngineError {
    fn from(err: IdError) -> Self {
        EngineError::InvalidInput(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::LearnerId;

    #[test]
    fn conflicts_and_bad_ids_map_to_caller_errors() {
        assert!(matches!(
            EngineError::from(StoreError::Conflict("dup".into())),
            EngineError::StorageConflict(_)
        ));
        assert!(matches!(
            EngineError::from(StoreError::Corrupt("row".into())),
            EngineError::Storage(_)
        ));
        let bad = LearnerId::parse("").unwrap_err();
        assert!(matches!(EngineError::from(bad), EngineError::InvalidInput(_)));
    }
}
