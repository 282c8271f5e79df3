use std::collections::BTreeSet;
use std::sync::Arc;

use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::workflows::discipline::{
    DisciplinaryService, EscalationResolver, InMemoryDisciplinaryStore, NewDisciplinaryRecord,
    OffenseOverflowPolicy, SanctionOverride, StudentLookup, ViolationId,
};
use crate::workflows::{StaffId, StoreError, StudentId};

pub(super) type TestService = DisciplinaryService<Roster, InMemoryDisciplinaryStore>;

/// Fixed set of enrolled students.
pub(super) struct Roster(BTreeSet<StudentId>);

impl Roster {
    pub(super) fn of(ids: &[&str]) -> Self {
        Self(ids.iter().map(|id| student(id)).collect())
    }
}

impl StudentLookup for Roster {
    fn student_exists(&self, student_id: &StudentId) -> Result<bool, StoreError> {
        Ok(self.0.contains(student_id))
    }
}

pub(super) fn student(id: &str) -> StudentId {
    StudentId(id.to_string())
}

pub(super) fn violations(ids: &[&str]) -> Vec<ViolationId> {
    ids.iter().map(|id| ViolationId(id.to_string())).collect()
}

pub(super) fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 9, d).expect("valid date")
}

pub(super) fn service_with(policy: OffenseOverflowPolicy) -> TestService {
    DisciplinaryService::new(
        Arc::new(Roster::of(&["s-100", "s-200"])),
        Arc::new(InMemoryDisciplinaryStore::default()),
        EscalationResolver::standard(policy),
    )
}

pub(super) fn service() -> TestService {
    service_with(OffenseOverflowPolicy::default())
}

pub(super) fn incident(student_id: &str, date: NaiveDate, ids: &[&str]) -> NewDisciplinaryRecord {
    NewDisciplinaryRecord {
        student_id: student(student_id),
        date,
        violations: violations(ids),
        witnesses: vec!["Guard on duty".to_string()],
        location: "Main gate".to_string(),
        evidence: None,
        recorded_by: Some(StaffId("t-discipline".to_string())),
        sanction_override: SanctionOverride::UseProposed,
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
