use std::sync::Arc;

use axum::response::Response;
use serde_json::Value;

use crate::workflows::clearance::{
    ClearanceService, ClearanceStore, ClearanceTransaction, Enrollment, InMemoryClearanceStore,
    InMemoryNotificationOutbox, InMemoryParticipationLedger, NotificationEmitter,
    NotificationError, RequirementCatalog, RequirementDefinition,
};
use crate::workflows::clearance::repository::ClearanceEvent;
use crate::workflows::discipline::InMemoryDisciplinaryStore;
use crate::workflows::{StaffId, StoreError, StudentId};

pub(super) const REQUIREMENTS: [&str; 4] = ["Math", "Science", "Librarian", "Class Adviser"];

pub(super) type TestService =
    ClearanceService<InMemoryClearanceStore, InMemoryDisciplinaryStore, InMemoryNotificationOutbox>;

pub(super) fn catalog() -> RequirementCatalog {
    RequirementCatalog::default()
        .with(
            RequirementDefinition::subject("Math", "t-math")
                .with_section_approver("Bonifacio", "t-math-bonifacio"),
        )
        .with(RequirementDefinition::subject("Science", "t-science"))
        .with(RequirementDefinition::office("Librarian", "o-library"))
        .with(RequirementDefinition::adviser("Class Adviser", "t-adviser"))
}

pub(super) fn staff(id: &str) -> StaffId {
    StaffId(id.to_string())
}

pub(super) fn enrollment(id: &str, section: &str) -> Enrollment {
    Enrollment {
        id: StudentId(id.to_string()),
        section: section.to_string(),
        education_level: "Junior High".to_string(),
        grade_level: "Grade 9".to_string(),
    }
}

pub(super) struct Harness {
    pub(super) service: TestService,
    pub(super) store: Arc<InMemoryClearanceStore>,
    pub(super) records: Arc<InMemoryDisciplinaryStore>,
    pub(super) outbox: Arc<InMemoryNotificationOutbox>,
    pub(super) participation: Arc<InMemoryParticipationLedger>,
}

pub(super) fn harness() -> Harness {
    let store = Arc::new(InMemoryClearanceStore::default());
    let records = Arc::new(InMemoryDisciplinaryStore::default());
    let outbox = Arc::new(InMemoryNotificationOutbox::default());
    let participation = Arc::new(InMemoryParticipationLedger::default());
    let service = ClearanceService::new(store.clone(), records.clone(), outbox.clone(), catalog())
        .with_participation(participation.clone());
    Harness {
        service,
        store,
        records,
        outbox,
        participation,
    }
}

/// Enroll a student in section Rizal with every test requirement pending.
pub(super) fn enrolled(service: &TestService, id: &str) -> StudentId {
    let student = service
        .enroll(enrollment(id, "Rizal"))
        .expect("enrollment succeeds");
    service
        .assign_requirements(&student.id, &REQUIREMENTS)
        .expect("requirements assigned");
    student.id
}

#[derive(Default)]
pub(super) struct FailingNotifier;

impl NotificationEmitter for FailingNotifier {
    fn emit(&self, _event: ClearanceEvent) -> Result<(), NotificationError> {
        Err(NotificationError::Transport("smtp relay offline".to_string()))
    }
}

pub(super) struct UnavailableStore;

impl ClearanceStore for UnavailableStore {
    fn transaction<T, E, F>(&self, _work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn ClearanceTransaction) -> Result<T, E>,
        E: From<StoreError>,
    {
        Err(E::from(StoreError::Unavailable("database offline".to_string())))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
