use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{ClearanceRequest, RequestId, RequestStatus, RequirementKey, Student};
use crate::workflows::{StaffId, StoreError, StudentId};

/// Student records as seen from inside a clearance transaction.
pub trait StudentStore {
    fn get(&self, id: &StudentId) -> Result<Option<Student>, StoreError>;
    fn insert(&mut self, student: Student) -> Result<Student, StoreError>;
    fn set_clearance_flag(
        &mut self,
        id: &StudentId,
        key: &RequirementKey,
        cleared: bool,
    ) -> Result<(), StoreError>;
    /// Promotion: new grade level, empty clearance map.
    fn reset_clearance(&mut self, id: &StudentId, grade_level: &str) -> Result<(), StoreError>;
    fn list_by_section(&self, section: &str) -> Result<Vec<Student>, StoreError>;
}

/// Status change applied to a stored request, checked against `expected_version`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTransition {
    pub expected_version: u64,
    pub status: RequestStatus,
    pub decided_at: DateTime<Utc>,
    pub decided_by: StaffId,
}

/// Clearance requests as seen from inside a clearance transaction.
pub trait RequestStore {
    fn create(&mut self, request: ClearanceRequest) -> Result<ClearanceRequest, StoreError>;
    fn get(&self, id: &RequestId) -> Result<Option<ClearanceRequest>, StoreError>;
    /// Fails with [`StoreError::StaleVersion`] when the stored version moved on.
    fn update(
        &mut self,
        id: &RequestId,
        transition: RequestTransition,
    ) -> Result<ClearanceRequest, StoreError>;
    fn find_pending(
        &self,
        student_id: &StudentId,
        key: &RequirementKey,
    ) -> Result<Option<ClearanceRequest>, StoreError>;
    fn find_for_requirement(
        &self,
        student_id: &StudentId,
        key: &RequirementKey,
    ) -> Result<Vec<ClearanceRequest>, StoreError>;
    fn pending_for_approver(&self, approver: &StaffId) -> Result<Vec<ClearanceRequest>, StoreError>;
}

/// Unit of work spanning students and requests.
pub trait ClearanceTransaction {
    fn students(&mut self) -> &mut dyn StudentStore;
    fn requests(&mut self) -> &mut dyn RequestStore;
}

/// Storage abstraction so request decisions and clearance flips commit together.
pub trait ClearanceStore: Send + Sync {
    /// Runs `work` in isolation from other transactions. Nothing is persisted unless it
    /// returns `Ok`.
    fn transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn ClearanceTransaction) -> Result<T, E>,
        E: From<StoreError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventOutcome {
    Approved,
    Rejected,
}

/// Raised after a clearance decision commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearanceEvent {
    pub student_id: StudentId,
    pub requirement_key: RequirementKey,
    pub outcome: EventOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Fire-and-forget notification hook (e-mail, push, in-app inbox).
pub trait NotificationEmitter: Send + Sync {
    fn emit(&self, event: ClearanceEvent) -> Result<(), NotificationError>;
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// Attendance and event participation, shown to advisers when reviewing requests.
pub trait ParticipationLedger: Send + Sync {
    fn participation_count(&self, student_id: &StudentId) -> Result<u32, StoreError>;
}
