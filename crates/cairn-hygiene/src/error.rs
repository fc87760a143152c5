//! Hygiene error types

use thiserror::Error;

/// Errors that can occur during a hygiene sweep
#[derive(Error, Debug)]
pub enum HygieneError {
    /// Storage layer error
    #[error("Store error: {0}")]
    Store(String),
}
