//! Clearance sign-off: per-requirement state, the request/approval state machine,
//! and completion tracking.

pub mod completion;
pub mod domain;
pub mod memory;
pub mod report;
pub mod repository;
pub mod requirements;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use completion::{completion_percentage, is_fully_cleared, Completion};
pub use domain::{
    ClearanceMap, ClearanceRequest, Enrollment, RequestId, RequestStatus, RequirementKey, Student,
};
pub use memory::{InMemoryClearanceStore, InMemoryNotificationOutbox, InMemoryParticipationLedger};
pub use report::{Bottleneck, SectionReport, StudentCompletionEntry};
pub use repository::{
    ClearanceEvent, ClearanceStore, ClearanceTransaction, EventOutcome, NotificationEmitter,
    NotificationError, ParticipationLedger, RequestStore, RequestTransition, StudentStore,
};
pub use requirements::{RequirementCatalog, RequirementDefinition, RequirementKind};
pub use router::clearance_router;
pub use service::{
    BulkFailure, BulkResult, ClearanceError, ClearanceService, Decision, DirectClearance,
    ErrorKind, ReviewContext, StudentClearanceView,
};
