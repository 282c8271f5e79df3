use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identifier assigned to a student at enrollment.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentId(pub String);

/// Faculty or office account uid acting on clearance and discipline.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaffId(pub String);

/// Opaque pointer into file storage; never dereferenced here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileRef(pub String);

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for StaffId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Failures surfaced by storage adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("record '{0}' already exists")]
    Conflict(String),
    #[error("record '{0}' not found")]
    NotFound(String),
    #[error("record '{id}' changed concurrently (expected version {expected}, found {found})")]
    StaleVersion { id: String, expected: u64, found: u64 },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
