use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};

use super::common::*;
use crate::workflows::clearance::{
    ClearanceError, ClearanceService, ErrorKind, InMemoryClearanceStore, RequestStatus,
    RequirementKey, RequirementKind,
};
use crate::workflows::discipline::{
    DisciplinaryRecord, DisciplinaryRecordId, DisciplinaryRecordStore, InMemoryDisciplinaryStore,
    Sanction, ViolationClass, ViolationId,
};
use crate::workflows::StudentId;

fn record_for(student: &StudentId, id: &str) -> DisciplinaryRecord {
    DisciplinaryRecord {
        id: DisciplinaryRecordId(id.to_string()),
        student_id: student.clone(),
        date: NaiveDate::from_ymd_opt(2026, 8, 14).expect("valid date"),
        violations: vec![ViolationId("A2".to_string())],
        classes: BTreeSet::from([ViolationClass::A]),
        sanctions: vec![Sanction::new("Oral Warning")],
        witnesses: vec!["Guard on duty".to_string()],
        location: "Main gate".to_string(),
        evidence: None,
        recorded_by: None,
        recorded_at: Utc::now(),
    }
}

#[test]
fn enroll_rejects_duplicate_student() {
    let harness = harness();
    harness
        .service
        .enroll(enrollment("s-200", "Rizal"))
        .expect("first enrollment");

    let error = harness
        .service
        .enroll(enrollment("s-200", "Rizal"))
        .expect_err("duplicate enrollment");
    assert_eq!(error.kind(), ErrorKind::Conflict);
}

#[test]
fn assign_requirements_keeps_existing_flags() {
    let harness = harness();
    let student = enrolled(&harness.service, "s-201");
    harness
        .service
        .direct_clear(&student, "Math", &staff("t-math"))
        .expect("clears");

    let view = harness
        .service
        .assign_requirements(&student, &["Math", "Science"])
        .expect("reassigned");

    assert_eq!(view.clearance.get(&RequirementKey::new("Math")), Some(true));
    assert_eq!(view.clearance.len(), REQUIREMENTS.len());
}

#[test]
fn promotion_resets_clearance_and_blocks_stale_approvals() {
    let harness = harness();
    let student = enrolled(&harness.service, "s-202");
    harness
        .service
        .direct_clear(&student, "Science", &staff("t-science"))
        .expect("clears");
    let pending = harness
        .service
        .submit(&student, "Math", Vec::new())
        .expect("submits");

    let view = harness
        .service
        .promote(&student, "Grade 10")
        .expect("promotes");
    assert_eq!(view.grade_level, "Grade 10");
    assert!(view.clearance.is_empty());
    assert_eq!(view.completion.percentage, 0);
    assert!(!view.completion.fully_cleared);

    match harness.service.approve(&pending.id, &staff("t-math")) {
        Err(ClearanceError::RequirementNotApplicable { .. }) => {}
        other => panic!("expected requirement not applicable, got {other:?}"),
    }
    let review = harness.service.review(&pending.id).expect("review");
    assert!(review.request.is_pending());
}

#[test]
fn review_surfaces_discipline_and_adviser_participation() {
    let harness = harness();
    let student = enrolled(&harness.service, "s-203");
    harness
        .records
        .append(record_for(&student, "dr-review-1"))
        .expect("append");
    harness
        .records
        .append(record_for(&student, "dr-review-2"))
        .expect("append");
    harness.participation.record(student.clone(), 7);

    let adviser = harness
        .service
        .submit(&student, "Class Adviser", Vec::new())
        .expect("submits");
    let subject = harness
        .service
        .submit(&student, "Math", Vec::new())
        .expect("submits");

    let adviser_review = harness.service.review(&adviser.id).expect("review");
    assert_eq!(adviser_review.requirement_kind, RequirementKind::Adviser);
    assert_eq!(adviser_review.disciplinary_records, 2);
    assert_eq!(adviser_review.participation_count, Some(7));

    let subject_review = harness.service.review(&subject.id).expect("review");
    assert_eq!(subject_review.disciplinary_records, 2);
    assert_eq!(subject_review.participation_count, None);
}

#[test]
fn approver_queue_lists_only_their_pending_requests() {
    let harness = harness();
    let first = enrolled(&harness.service, "s-204");
    let second = enrolled(&harness.service, "s-205");
    let older = harness
        .service
        .submit(&first, "Math", Vec::new())
        .expect("submits");
    let newer = harness
        .service
        .submit(&second, "Math", Vec::new())
        .expect("submits");
    harness
        .service
        .submit(&second, "Science", Vec::new())
        .expect("submits");
    let decided = enrolled(&harness.service, "s-206");
    let decided = harness
        .service
        .submit(&decided, "Math", Vec::new())
        .expect("submits");
    harness
        .service
        .approve(&decided.id, &staff("t-math"))
        .expect("approves");

    let queue = harness
        .service
        .pending_for_approver(&staff("t-math"))
        .expect("queue");

    let ids: Vec<_> = queue.iter().map(|request| request.id.clone()).collect();
    assert_eq!(ids, vec![older.id, newer.id]);
}

#[test]
fn notification_failure_does_not_roll_back_decision() {
    let store = Arc::new(InMemoryClearanceStore::default());
    let service = ClearanceService::new(
        store,
        Arc::new(InMemoryDisciplinaryStore::default()),
        Arc::new(FailingNotifier),
        catalog(),
    );
    let student = service
        .enroll(enrollment("s-207", "Rizal"))
        .expect("enrolls")
        .id;
    service
        .assign_requirements(&student, &["Math"])
        .expect("assigned");
    let request = service
        .submit(&student, "Math", Vec::new())
        .expect("submits");

    let decision = service
        .approve(&request.id, &staff("t-math"))
        .expect("approval survives notifier outage");

    assert_eq!(decision.request.status, RequestStatus::Approved);
    assert!(decision.completion.fully_cleared);
    let view = service.student(&student).expect("view");
    assert_eq!(view.clearance.get(&RequirementKey::new("Math")), Some(true));
}

#[test]
fn store_outage_surfaces_as_unavailable() {
    let service = ClearanceService::new(
        Arc::new(UnavailableStore),
        Arc::new(InMemoryDisciplinaryStore::default()),
        Arc::new(FailingNotifier),
        catalog(),
    );

    let error = service
        .submit(&StudentId("s-208".to_string()), "Math", Vec::new())
        .expect_err("store offline");
    assert_eq!(error.kind(), ErrorKind::Unavailable);

    let bulk = service.bulk_approve(
        &[crate::workflows::clearance::RequestId("cr-1".to_string())],
        &staff("t-math"),
    );
    assert!(bulk.succeeded.is_empty());
    assert_eq!(bulk.failed[0].kind, ErrorKind::Unavailable);
}

#[test]
fn unknown_student_is_not_found() {
    let harness = harness();
    let error = harness
        .service
        .submit(&StudentId("ghost".to_string()), "Math", Vec::new())
        .expect_err("unknown student");
    assert!(matches!(error, ClearanceError::StudentNotFound(_)));
    assert_eq!(error.kind(), ErrorKind::NotFound);
}

#[test]
fn section_report_reflects_workflow_state() {
    let harness = harness();
    let first = enrolled(&harness.service, "s-209");
    enrolled(&harness.service, "s-210");
    for name in REQUIREMENTS {
        harness
            .service
            .direct_clear(&first, name, &staff("registrar"))
            .expect("clears");
    }

    let report = harness.service.section_report("Rizal").expect("report");

    assert_eq!(report.students, 2);
    assert_eq!(report.fully_cleared, 1);
    assert_eq!(report.outstanding.get(&RequirementKey::new("Math")), Some(&1));
}
