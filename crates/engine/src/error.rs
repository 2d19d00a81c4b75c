//! The module contains the error the engine can throw.
//!
//! [`QuotaExceeded`] is special: it carries the full [`LimitCheck`] so the
//! HTTP layer can render the usage counters and the upgrade prompt.
//!
//!  [`QuotaExceeded`]: EngineError::QuotaExceeded
//!  [`LimitCheck`]: crate::LimitCheck
use sea_orm::DbErr;
use thiserror::Error;

use crate::LimitCheck;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("plan limit reached on plan {}", .0.plan_name)]
    QuotaExceeded(Box<LimitCheck>),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Validation(a), Self::Validation(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::QuotaExceeded(a), Self::QuotaExceeded(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
