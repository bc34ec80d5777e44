//! Synchronization error types

use thiserror::Error;

/// Domain violations detected before any remote call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// External vehicles are fed by their own source and cannot be edited
    #[error("{0} is an external ground vehicle; its state cannot be set")]
    ExternalEntity(String),

    /// Plan index outside `0..plan_length`
    #[error("drive plan index {index} is invalid (plan length {plan_length})")]
    InvalidPlanIndex { index: i64, plan_length: usize },
}

/// Failures loading vehicle definitions on the server
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unable to read vehicle file: {0}")]
    Io(#[from] std::io::Error),

    #[error("unable to parse vehicle file: {0}")]
    Parse(#[from] serde_json::Error),
}
