use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workflows::{FileRef, StaffId, StudentId};

/// Canonical subject or office name. Obtain validated keys through
/// [`RequirementCatalog::resolve`](super::RequirementCatalog::resolve).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequirementKey(String);

impl RequirementKey {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequirementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Requirement key to cleared flag. A missing key means the requirement does not apply,
/// `false` means pending, `true` means cleared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClearanceMap(BTreeMap<RequirementKey, bool>);

impl ClearanceMap {
    pub fn get(&self, key: &RequirementKey) -> Option<bool> {
        self.0.get(key).copied()
    }

    pub fn applies(&self, key: &RequirementKey) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn cleared_count(&self) -> usize {
        self.0.values().filter(|cleared| **cleared).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RequirementKey, bool)> {
        self.0.iter().map(|(key, cleared)| (key, *cleared))
    }

    pub fn outstanding(&self) -> impl Iterator<Item = &RequirementKey> {
        self.0
            .iter()
            .filter(|(_, cleared)| !**cleared)
            .map(|(key, _)| key)
    }

    pub(crate) fn set(&mut self, key: RequirementKey, cleared: bool) {
        self.0.insert(key, cleared);
    }

    pub(crate) fn clear(&mut self) {
        self.0.clear();
    }
}

impl FromIterator<(RequirementKey, bool)> for ClearanceMap {
    fn from_iter<I: IntoIterator<Item = (RequirementKey, bool)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub section: String,
    pub education_level: String,
    pub grade_level: String,
    pub clearance: ClearanceMap,
}

/// Classification captured at enrollment; the clearance map starts empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: StudentId,
    pub section: String,
    pub education_level: String,
    pub grade_level: String,
}

impl From<Enrollment> for Student {
    fn from(enrollment: Enrollment) -> Self {
        Self {
            id: enrollment.id,
            section: enrollment.section,
            education_level: enrollment.education_level,
            grade_level: enrollment.grade_level,
            clearance: ClearanceMap::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub String);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Request lifecycle. Only `Pending` accepts a decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected { reason: String },
}

impl RequestStatus {
    pub const fn label(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected { .. } => "rejected",
        }
    }
}

/// A student's ask for sign-off on one requirement. Resubmission after a rejection
/// creates a new request; decided requests are never reopened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearanceRequest {
    pub id: RequestId,
    pub student_id: StudentId,
    pub approver_id: StaffId,
    pub requirement_key: RequirementKey,
    #[serde(flatten)]
    pub status: RequestStatus,
    #[serde(default)]
    pub attachments: Vec<FileRef>,
    pub submitted_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decided_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decided_by: Option<StaffId>,
    /// Bumped on every stored transition; guards concurrent decisions.
    pub version: u64,
}

impl ClearanceRequest {
    pub fn pending(
        id: RequestId,
        student_id: StudentId,
        approver_id: StaffId,
        requirement_key: RequirementKey,
        attachments: Vec<FileRef>,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            student_id,
            approver_id,
            requirement_key,
            status: RequestStatus::Pending,
            attachments,
            submitted_at,
            decided_at: None,
            decided_by: None,
            version: 0,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.status, RequestStatus::Pending)
    }

    pub fn rejection_reason(&self) -> Option<&str> {
        match &self.status {
            RequestStatus::Rejected { reason } => Some(reason),
            RequestStatus::Pending | RequestStatus::Approved => None,
        }
    }
}
