use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::completion::Completion;
use super::domain::{
    ClearanceMap, ClearanceRequest, Enrollment, RequestId, RequestStatus, RequirementKey, Student,
};
use super::report::SectionReport;
use super::repository::{
    ClearanceEvent, ClearanceStore, ClearanceTransaction, EventOutcome, NotificationEmitter,
    ParticipationLedger, RequestTransition,
};
use super::requirements::{RequirementCatalog, RequirementKind};
use crate::workflows::discipline::DisciplinaryRecordStore;
use crate::workflows::{FileRef, StaffId, StoreError, StudentId};

/// Error raised by the clearance service.
#[derive(Debug, thiserror::Error)]
pub enum ClearanceError {
    #[error("a rejection reason is required")]
    MissingRejectionReason,
    #[error("request {request_id} is already pending for {student_id} / {requirement_key}")]
    DuplicatePending {
        student_id: StudentId,
        requirement_key: RequirementKey,
        request_id: RequestId,
    },
    #[error("{requirement_key} is already cleared for {student_id}")]
    AlreadyCleared {
        student_id: StudentId,
        requirement_key: RequirementKey,
    },
    #[error("request {request_id} is {status}, not pending")]
    NotPending {
        request_id: RequestId,
        status: &'static str,
    },
    #[error("request {0} not found")]
    RequestNotFound(RequestId),
    #[error("student {0} not found")]
    StudentNotFound(StudentId),
    #[error("unknown requirement '{0}'")]
    UnknownRequirement(String),
    #[error("{requirement_key} does not apply to {student_id}")]
    RequirementNotApplicable {
        student_id: StudentId,
        requirement_key: RequirementKey,
    },
    #[error("{approver_id} is not the designated approver for request {request_id}")]
    NotDesignatedApprover {
        request_id: RequestId,
        approver_id: StaffId,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Caller-facing error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Conflict,
    InvalidState,
    NotFound,
    Forbidden,
    Unavailable,
}

impl ClearanceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClearanceError::MissingRejectionReason => ErrorKind::Validation,
            ClearanceError::DuplicatePending { .. } | ClearanceError::AlreadyCleared { .. } => {
                ErrorKind::Conflict
            }
            ClearanceError::NotPending { .. } => ErrorKind::InvalidState,
            ClearanceError::RequestNotFound(_)
            | ClearanceError::StudentNotFound(_)
            | ClearanceError::UnknownRequirement(_)
            | ClearanceError::RequirementNotApplicable { .. } => ErrorKind::NotFound,
            ClearanceError::NotDesignatedApprover { .. } => ErrorKind::Forbidden,
            ClearanceError::Store(StoreError::Conflict(_)) => ErrorKind::Conflict,
            ClearanceError::Store(StoreError::NotFound(_)) => ErrorKind::NotFound,
            ClearanceError::Store(StoreError::StaleVersion { .. }) => ErrorKind::InvalidState,
            ClearanceError::Store(StoreError::Unavailable(_)) => ErrorKind::Unavailable,
        }
    }
}

/// Committed approve/reject result with the recomputed completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub request: ClearanceRequest,
    pub completion: Completion,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectClearance {
    pub student_id: StudentId,
    pub requirement_key: RequirementKey,
    /// Requests that were pending or rejected and now read as approved.
    pub resolved_requests: Vec<ClearanceRequest>,
    pub completion: Completion,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkFailure {
    pub request_id: RequestId,
    pub kind: ErrorKind,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkResult {
    pub succeeded: Vec<RequestId>,
    pub failed: Vec<BulkFailure>,
}

/// Read-only inputs shown to an approver. Nothing here gates the decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewContext {
    pub request: ClearanceRequest,
    pub requirement_kind: RequirementKind,
    pub completion: Completion,
    pub disciplinary_records: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub participation_count: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudentClearanceView {
    pub student_id: StudentId,
    pub section: String,
    pub grade_level: String,
    pub clearance: ClearanceMap,
    pub completion: Completion,
}

impl From<Student> for StudentClearanceView {
    fn from(student: Student) -> Self {
        let completion = Completion::of(&student.clearance);
        Self {
            student_id: student.id,
            section: student.section,
            grade_level: student.grade_level,
            clearance: student.clearance,
            completion,
        }
    }
}

static REQUEST_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_request_id() -> RequestId {
    let id = REQUEST_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    RequestId(format!("cr-{id:06}"))
}

/// Service composing the clearance store, disciplinary log, and notification hook.
pub struct ClearanceService<S, D, N> {
    store: Arc<S>,
    records: Arc<D>,
    notifications: Arc<N>,
    catalog: Arc<RequirementCatalog>,
    participation: Option<Arc<dyn ParticipationLedger>>,
}

impl<S, D, N> ClearanceService<S, D, N>
where
    S: ClearanceStore + 'static,
    D: DisciplinaryRecordStore + 'static,
    N: NotificationEmitter + 'static,
{
    pub fn new(
        store: Arc<S>,
        records: Arc<D>,
        notifications: Arc<N>,
        catalog: RequirementCatalog,
    ) -> Self {
        Self {
            store,
            records,
            notifications,
            catalog: Arc::new(catalog),
            participation: None,
        }
    }

    pub fn with_participation(mut self, ledger: Arc<dyn ParticipationLedger>) -> Self {
        self.participation = Some(ledger);
        self
    }

    pub fn catalog(&self) -> &RequirementCatalog {
        &self.catalog
    }

    pub fn enroll(&self, enrollment: Enrollment) -> Result<Student, ClearanceError> {
        let student = self.store.transaction(|tx| {
            tx.students()
                .insert(Student::from(enrollment))
                .map_err(ClearanceError::from)
        })?;
        info!(student = %student.id, section = %student.section, "student enrolled");
        Ok(student)
    }

    /// Mark requirements as applicable. Existing flags are left as they are.
    pub fn assign_requirements(
        &self,
        student_id: &StudentId,
        requirements: &[&str],
    ) -> Result<StudentClearanceView, ClearanceError> {
        let keys = requirements
            .iter()
            .map(|name| self.resolve_key(name))
            .collect::<Result<Vec<_>, _>>()?;

        let student = self.store.transaction(|tx| {
            let student = load_student(tx, student_id)?;
            for key in keys {
                if !student.clearance.applies(&key) {
                    tx.students().set_clearance_flag(student_id, &key, false)?;
                }
            }
            load_student(tx, student_id)
        })?;

        Ok(StudentClearanceView::from(student))
    }

    /// Move the student to a new grade level; every requirement must be re-evaluated.
    pub fn promote(
        &self,
        student_id: &StudentId,
        grade_level: &str,
    ) -> Result<StudentClearanceView, ClearanceError> {
        let student = self.store.transaction(|tx| {
            load_student(tx, student_id)?;
            tx.students().reset_clearance(student_id, grade_level)?;
            load_student(tx, student_id)
        })?;
        info!(student = %student_id, grade_level, "student promoted, clearance reset");
        Ok(StudentClearanceView::from(student))
    }

    pub fn submit(
        &self,
        student_id: &StudentId,
        requirement: &str,
        attachments: Vec<FileRef>,
    ) -> Result<ClearanceRequest, ClearanceError> {
        let key = self.resolve_key(requirement)?;
        let submitted_at = Utc::now();

        let request = self.store.transaction(|tx| {
            let student = load_student(tx, student_id)?;
            match student.clearance.get(&key) {
                None => {
                    return Err(ClearanceError::RequirementNotApplicable {
                        student_id: student_id.clone(),
                        requirement_key: key.clone(),
                    })
                }
                Some(true) => {
                    return Err(ClearanceError::AlreadyCleared {
                        student_id: student_id.clone(),
                        requirement_key: key.clone(),
                    })
                }
                Some(false) => {}
            }

            if let Some(existing) = tx.requests().find_pending(student_id, &key)? {
                return Err(ClearanceError::DuplicatePending {
                    student_id: student_id.clone(),
                    requirement_key: key.clone(),
                    request_id: existing.id,
                });
            }

            let approver = self
                .catalog
                .designated_approver(&key, &student.section)
                .cloned()
                .ok_or_else(|| ClearanceError::UnknownRequirement(key.to_string()))?;

            let request = ClearanceRequest::pending(
                next_request_id(),
                student_id.clone(),
                approver,
                key.clone(),
                attachments,
                submitted_at,
            );
            Ok(tx.requests().create(request)?)
        })?;

        info!(
            request = %request.id,
            student = %request.student_id,
            requirement = %request.requirement_key,
            approver = %request.approver_id,
            "clearance request submitted"
        );
        Ok(request)
    }

    pub fn approve(
        &self,
        request_id: &RequestId,
        approver_id: &StaffId,
    ) -> Result<Decision, ClearanceError> {
        let decided_at = Utc::now();

        let decision = self.store.transaction(|tx| {
            let request = load_pending_for(tx, request_id, approver_id)?;
            let student = load_student(tx, &request.student_id)?;
            if !student.clearance.applies(&request.requirement_key) {
                return Err(ClearanceError::RequirementNotApplicable {
                    student_id: request.student_id.clone(),
                    requirement_key: request.requirement_key.clone(),
                });
            }

            let resolved = grant_clearance(
                tx,
                &request.student_id,
                &request.requirement_key,
                approver_id,
                decided_at,
                Resolve::Pending,
            )?;
            let request = resolved
                .into_iter()
                .find(|resolved| resolved.id == request.id)
                .ok_or_else(|| ClearanceError::RequestNotFound(request.id.clone()))?;
            let student = load_student(tx, &request.student_id)?;

            Ok(Decision {
                completion: Completion::of(&student.clearance),
                request,
            })
        })?;

        info!(
            request = %decision.request.id,
            student = %decision.request.student_id,
            requirement = %decision.request.requirement_key,
            completion = decision.completion.percentage,
            "clearance request approved"
        );
        self.notify(ClearanceEvent {
            student_id: decision.request.student_id.clone(),
            requirement_key: decision.request.requirement_key.clone(),
            outcome: EventOutcome::Approved,
            reason: None,
        });
        Ok(decision)
    }

    pub fn reject(
        &self,
        request_id: &RequestId,
        approver_id: &StaffId,
        reason: &str,
    ) -> Result<Decision, ClearanceError> {
        let reason = reason.trim();
        let decided_at = Utc::now();

        let decision = self.store.transaction(|tx| {
            let request = load_pending_for(tx, request_id, approver_id)?;
            if reason.is_empty() {
                return Err(ClearanceError::MissingRejectionReason);
            }
            let request = tx.requests().update(
                &request.id,
                RequestTransition {
                    expected_version: request.version,
                    status: RequestStatus::Rejected {
                        reason: reason.to_string(),
                    },
                    decided_at,
                    decided_by: approver_id.clone(),
                },
            )?;
            let student = load_student(tx, &request.student_id)?;

            Ok::<_, ClearanceError>(Decision {
                completion: Completion::of(&student.clearance),
                request,
            })
        })?;

        info!(
            request = %decision.request.id,
            student = %decision.request.student_id,
            requirement = %decision.request.requirement_key,
            reason,
            "clearance request rejected"
        );
        self.notify(ClearanceEvent {
            student_id: decision.request.student_id.clone(),
            requirement_key: decision.request.requirement_key.clone(),
            outcome: EventOutcome::Rejected,
            reason: Some(reason.to_string()),
        });
        Ok(decision)
    }

    /// Clear a requirement without a submission. Outstanding requests for the same
    /// requirement are resolved so both paths agree on the clearance flag.
    pub fn direct_clear(
        &self,
        student_id: &StudentId,
        requirement: &str,
        actor_id: &StaffId,
    ) -> Result<DirectClearance, ClearanceError> {
        let key = self.resolve_key(requirement)?;
        let decided_at = Utc::now();

        let cleared = self.store.transaction(|tx| {
            load_student(tx, student_id)?;
            let resolved_requests =
                grant_clearance(tx, student_id, &key, actor_id, decided_at, Resolve::Outstanding)?;
            let student = load_student(tx, student_id)?;

            Ok::<_, ClearanceError>(DirectClearance {
                student_id: student_id.clone(),
                requirement_key: key.clone(),
                resolved_requests,
                completion: Completion::of(&student.clearance),
            })
        })?;

        info!(
            student = %student_id,
            requirement = %cleared.requirement_key,
            actor = %actor_id,
            resolved = cleared.resolved_requests.len(),
            completion = cleared.completion.percentage,
            "requirement cleared directly"
        );
        self.notify(ClearanceEvent {
            student_id: student_id.clone(),
            requirement_key: cleared.requirement_key.clone(),
            outcome: EventOutcome::Approved,
            reason: None,
        });
        Ok(cleared)
    }

    /// Approve each request independently; failures are reported per item.
    pub fn bulk_approve(&self, request_ids: &[RequestId], approver_id: &StaffId) -> BulkResult {
        let mut result = BulkResult::default();
        for request_id in request_ids {
            match self.approve(request_id, approver_id) {
                Ok(_) => result.succeeded.push(request_id.clone()),
                Err(error) => result.failed.push(BulkFailure {
                    request_id: request_id.clone(),
                    kind: error.kind(),
                    reason: error.to_string(),
                }),
            }
        }

        info!(
            approver = %approver_id,
            succeeded = result.succeeded.len(),
            failed = result.failed.len(),
            "bulk approval finished"
        );
        result
    }

    pub fn review(&self, request_id: &RequestId) -> Result<ReviewContext, ClearanceError> {
        let (request, student) = self.store.transaction(|tx| {
            let request = tx
                .requests()
                .get(request_id)?
                .ok_or_else(|| ClearanceError::RequestNotFound(request_id.clone()))?;
            let student = load_student(tx, &request.student_id)?;
            Ok::<_, ClearanceError>((request, student))
        })?;

        let requirement_kind = self
            .catalog
            .definition(&request.requirement_key)
            .map(|definition| definition.kind)
            .ok_or_else(|| {
                ClearanceError::UnknownRequirement(request.requirement_key.to_string())
            })?;
        let disciplinary_records = self.records.count_for_student(&student.id)?;
        let participation_count = match (&self.participation, requirement_kind) {
            (Some(ledger), RequirementKind::Adviser) => {
                Some(ledger.participation_count(&student.id)?)
            }
            _ => None,
        };

        Ok(ReviewContext {
            request,
            requirement_kind,
            completion: Completion::of(&student.clearance),
            disciplinary_records,
            participation_count,
        })
    }

    /// Pending requests assigned to `approver_id`, oldest first.
    pub fn pending_for_approver(
        &self,
        approver_id: &StaffId,
    ) -> Result<Vec<ClearanceRequest>, ClearanceError> {
        let mut queue = self
            .store
            .transaction(|tx| tx.requests().pending_for_approver(approver_id))
            .map_err(ClearanceError::from)?;
        queue.sort_by(|left, right| {
            left.submitted_at
                .cmp(&right.submitted_at)
                .then_with(|| left.id.cmp(&right.id))
        });
        Ok(queue)
    }

    pub fn student(&self, student_id: &StudentId) -> Result<StudentClearanceView, ClearanceError> {
        let student = self.store.transaction(|tx| load_student(tx, student_id))?;
        Ok(StudentClearanceView::from(student))
    }

    pub fn completion(&self, student_id: &StudentId) -> Result<Completion, ClearanceError> {
        Ok(self.student(student_id)?.completion)
    }

    pub fn section_report(&self, section: &str) -> Result<SectionReport, ClearanceError> {
        let students = self
            .store
            .transaction(|tx| tx.students().list_by_section(section))
            .map_err(ClearanceError::from)?;
        Ok(SectionReport::build(section, &students))
    }

    fn resolve_key(&self, requirement: &str) -> Result<RequirementKey, ClearanceError> {
        self.catalog
            .resolve(requirement)
            .ok_or_else(|| ClearanceError::UnknownRequirement(requirement.trim().to_string()))
    }

    fn notify(&self, event: ClearanceEvent) {
        if let Err(error) = self.notifications.emit(event.clone()) {
            warn!(
                student = %event.student_id,
                requirement = %event.requirement_key,
                outcome = ?event.outcome,
                %error,
                "clearance notification failed"
            );
        }
    }
}

fn load_student(
    tx: &mut dyn ClearanceTransaction,
    student_id: &StudentId,
) -> Result<Student, ClearanceError> {
    tx.students()
        .get(student_id)?
        .ok_or_else(|| ClearanceError::StudentNotFound(student_id.clone()))
}

fn load_pending_for(
    tx: &mut dyn ClearanceTransaction,
    request_id: &RequestId,
    approver_id: &StaffId,
) -> Result<ClearanceRequest, ClearanceError> {
    let request = tx
        .requests()
        .get(request_id)?
        .ok_or_else(|| ClearanceError::RequestNotFound(request_id.clone()))?;

    if &request.approver_id != approver_id {
        return Err(ClearanceError::NotDesignatedApprover {
            request_id: request_id.clone(),
            approver_id: approver_id.clone(),
        });
    }

    match request.status {
        RequestStatus::Pending => Ok(request),
        RequestStatus::Approved | RequestStatus::Rejected { .. } => {
            Err(ClearanceError::NotPending {
                request_id: request_id.clone(),
                status: request.status.label(),
            })
        }
    }
}

/// Which requests for the pair a grant moves to approved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resolve {
    /// Pending requests only; rejections stay as decided.
    Pending,
    /// Pending and rejected requests.
    Outstanding,
}

/// The single path that sets a clearance flag to true.
fn grant_clearance(
    tx: &mut dyn ClearanceTransaction,
    student_id: &StudentId,
    key: &RequirementKey,
    actor_id: &StaffId,
    decided_at: DateTime<Utc>,
    scope: Resolve,
) -> Result<Vec<ClearanceRequest>, ClearanceError> {
    tx.students().set_clearance_flag(student_id, key, true)?;

    let requests = tx.requests().find_for_requirement(student_id, key)?;
    let mut resolved = Vec::new();
    for request in requests {
        let resolvable = match request.status {
            RequestStatus::Pending => true,
            RequestStatus::Rejected { .. } => scope == Resolve::Outstanding,
            RequestStatus::Approved => false,
        };
        if !resolvable {
            continue;
        }
        let updated = tx.requests().update(
            &request.id,
            RequestTransition {
                expected_version: request.version,
                status: RequestStatus::Approved,
                decided_at,
                decided_by: actor_id.clone(),
            },
        )?;
        resolved.push(updated);
    }
    Ok(resolved)
}
