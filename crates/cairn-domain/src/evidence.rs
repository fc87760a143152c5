//! Evidence artifacts - immutable, content-addressed supporting material

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of an evidence artifact: the lowercase hex SHA-256
/// checksum of its content
///
/// Content addressing makes artifacts immutable by construction: the
/// same bytes always produce the same id, and a stored artifact can be
/// re-verified against its id at any time. Checksum computation lives
/// in the storage layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactId(String);

impl ArtifactId {
    /// Create an artifact id from a hex-encoded SHA-256 checksum
    ///
    /// # Errors
    /// Returns an error unless the input is exactly 64 lowercase hex
    /// characters.
    pub fn from_checksum(checksum: impl Into<String>) -> Result<Self, String> {
        let checksum = checksum.into();
        if checksum.len() != 64 {
            return Err(format!(
                "Expected 64 hex characters for SHA-256 checksum, got {}",
                checksum.len()
            ));
        }
        if !checksum.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase()) {
            return Err("Checksum must be lowercase hex".to_string());
        }
        Ok(Self(checksum))
    }

    /// Get the checksum as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
