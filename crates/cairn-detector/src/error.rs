//! Detector error types

use thiserror::Error;

/// Errors that can occur during a contamination scan
#[derive(Error, Debug)]
pub enum DetectorError {
    /// Storage layer error
    #[error("Store error: {0}")]
    Store(String),
}
