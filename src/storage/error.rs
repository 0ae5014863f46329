use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures raised inside local storage access.
///
/// From a caller's point of view these are processing failures: they travel
/// back to the coordinator wrapped in `ProcessingError::Store`.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreError {
    #[error("no condition registered under '{condition}'")]
    UnsatisfiableCondition { condition: String },

    #[error("no comparator registered under '{comparator}'")]
    UnknownComparator { comparator: String },

    #[error("no update function registered under '{function}'")]
    UnknownFunction { function: String },

    #[error("invalid predicate '{expression}', expected <condition>:<expression>")]
    InvalidPredicate { expression: String },

    #[error("condition not satisfied for key '{key}' in bucket '{bucket}'")]
    ConditionFailed { bucket: String, key: String },

    #[error("key '{key}' not found in bucket '{bucket}'")]
    KeyNotFound { bucket: String, key: String },

    #[error("update function '{function}' timed out")]
    Timeout { function: String },

    #[error("backup failure: {reason}")]
    Backup { reason: String },

    #[error("malformed data: {reason}")]
    Malformed { reason: String },
}
