use super::common::*;
use crate::workflows::clearance::repository::EventOutcome;
use crate::workflows::clearance::{ClearanceError, ErrorKind, RequestStatus, RequirementKey};
use crate::workflows::FileRef;

#[test]
fn submit_creates_pending_request_for_designated_approver() {
    let harness = harness();
    let student = enrolled(&harness.service, "s-100");

    let request = harness
        .service
        .submit(
            &student,
            "math",
            vec![FileRef("uploads/s-100/math-portfolio.pdf".to_string())],
        )
        .expect("submission succeeds");

    assert_eq!(request.status, RequestStatus::Pending);
    assert_eq!(request.requirement_key, RequirementKey::new("Math"));
    assert_eq!(request.approver_id, staff("t-math"));
    assert_eq!(request.attachments.len(), 1);
    assert!(request.decided_at.is_none());

    let view = harness.service.student(&student).expect("student view");
    assert_eq!(view.clearance.get(&RequirementKey::new("Math")), Some(false));
}

#[test]
fn submit_routes_to_section_specific_approver() {
    let harness = harness();
    let student = harness
        .service
        .enroll(enrollment("s-101", "Bonifacio"))
        .expect("enrolls");
    harness
        .service
        .assign_requirements(&student.id, &["Math"])
        .expect("assigned");

    let request = harness
        .service
        .submit(&student.id, "Math", Vec::new())
        .expect("submits");

    assert_eq!(request.approver_id, staff("t-math-bonifacio"));
}

#[test]
fn second_pending_submission_conflicts() {
    let harness = harness();
    let student = enrolled(&harness.service, "s-102");
    let first = harness
        .service
        .submit(&student, "Math", Vec::new())
        .expect("first submission");

    match harness.service.submit(&student, "Math", Vec::new()) {
        Err(ClearanceError::DuplicatePending { request_id, .. }) => {
            assert_eq!(request_id, first.id)
        }
        other => panic!("expected duplicate pending conflict, got {other:?}"),
    }
}

#[test]
fn resubmission_after_rejection_creates_new_request() {
    let harness = harness();
    let student = enrolled(&harness.service, "s-103");
    let first = harness
        .service
        .submit(&student, "Science", Vec::new())
        .expect("first submission");
    harness
        .service
        .reject(&first.id, &staff("t-science"), "Lab report missing")
        .expect("rejects");

    let second = harness
        .service
        .submit(&student, "Science", Vec::new())
        .expect("resubmission succeeds");

    assert_ne!(first.id, second.id);
    assert!(second.is_pending());
    let review = harness.service.review(&first.id).expect("old request kept");
    assert_eq!(review.request.rejection_reason(), Some("Lab report missing"));
}

#[test]
fn submit_rejects_unknown_and_inapplicable_requirements() {
    let harness = harness();
    let student = harness
        .service
        .enroll(enrollment("s-104", "Rizal"))
        .expect("enrolls");
    harness
        .service
        .assign_requirements(&student.id, &["Math"])
        .expect("assigned");

    match harness.service.submit(&student.id, "Maths", Vec::new()) {
        Err(ClearanceError::UnknownRequirement(name)) => assert_eq!(name, "Maths"),
        other => panic!("expected unknown requirement, got {other:?}"),
    }

    let error = harness
        .service
        .submit(&student.id, "Librarian", Vec::new())
        .expect_err("librarian not assigned");
    assert!(matches!(
        error,
        ClearanceError::RequirementNotApplicable { .. }
    ));
    assert_eq!(error.kind(), ErrorKind::NotFound);
}

#[test]
fn submit_for_cleared_requirement_conflicts() {
    let harness = harness();
    let student = enrolled(&harness.service, "s-105");
    harness
        .service
        .direct_clear(&student, "Librarian", &staff("o-library"))
        .expect("cleared");

    let error = harness
        .service
        .submit(&student, "Librarian", Vec::new())
        .expect_err("already cleared");
    assert_eq!(error.kind(), ErrorKind::Conflict);
}

#[test]
fn approve_flips_clearance_and_notifies_once() {
    let harness = harness();
    let student = enrolled(&harness.service, "s-106");
    let request = harness
        .service
        .submit(&student, "Math", Vec::new())
        .expect("submits");

    let decision = harness
        .service
        .approve(&request.id, &staff("t-math"))
        .expect("approves");

    assert_eq!(decision.request.status, RequestStatus::Approved);
    assert!(decision.request.decided_at.is_some());
    assert_eq!(decision.request.decided_by, Some(staff("t-math")));
    assert_eq!(decision.completion.cleared, 1);
    assert_eq!(decision.completion.percentage, 25);

    let view = harness.service.student(&student).expect("view");
    assert_eq!(view.clearance.get(&RequirementKey::new("Math")), Some(true));

    let events = harness.outbox.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].outcome, EventOutcome::Approved);
    assert_eq!(events[0].student_id, student);
    assert_eq!(events[0].requirement_key, RequirementKey::new("Math"));
    assert!(events[0].reason.is_none());
}

#[test]
fn second_approve_fails_with_invalid_state_and_changes_nothing() {
    let harness = harness();
    let student = enrolled(&harness.service, "s-107");
    let request = harness
        .service
        .submit(&student, "Math", Vec::new())
        .expect("submits");
    let first = harness
        .service
        .approve(&request.id, &staff("t-math"))
        .expect("first approval");

    let error = harness
        .service
        .approve(&request.id, &staff("t-math"))
        .expect_err("second approval fails");

    assert_eq!(error.kind(), ErrorKind::InvalidState);
    let review = harness.service.review(&request.id).expect("review");
    assert_eq!(review.request, first.request);
    assert_eq!(harness.outbox.events().len(), 1);
}

#[test]
fn approve_checks_existence_and_designated_approver() {
    let harness = harness();
    let student = enrolled(&harness.service, "s-108");
    let request = harness
        .service
        .submit(&student, "Math", Vec::new())
        .expect("submits");

    let missing = harness
        .service
        .approve(
            &crate::workflows::clearance::RequestId("cr-missing".to_string()),
            &staff("t-math"),
        )
        .expect_err("unknown request");
    assert_eq!(missing.kind(), ErrorKind::NotFound);

    let forbidden = harness
        .service
        .approve(&request.id, &staff("t-science"))
        .expect_err("wrong approver");
    assert_eq!(forbidden.kind(), ErrorKind::Forbidden);

    let view = harness.service.student(&student).expect("view");
    assert_eq!(view.clearance.get(&RequirementKey::new("Math")), Some(false));
    assert!(harness.outbox.events().is_empty());
}

#[test]
fn reject_requires_reason_and_leaves_clearance_untouched() {
    let harness = harness();
    let student = enrolled(&harness.service, "s-109");
    let request = harness
        .service
        .submit(&student, "Science", Vec::new())
        .expect("submits");

    for blank in ["", "   "] {
        match harness.service.reject(&request.id, &staff("t-science"), blank) {
            Err(ClearanceError::MissingRejectionReason) => {}
            other => panic!("expected missing reason, got {other:?}"),
        }
    }

    let review = harness.service.review(&request.id).expect("review");
    assert!(review.request.is_pending());
    let view = harness.service.student(&student).expect("view");
    assert_eq!(
        view.clearance.get(&RequirementKey::new("Science")),
        Some(false)
    );
    assert!(harness.outbox.events().is_empty());
}

#[test]
fn reject_checks_approver_before_reason() {
    let harness = harness();
    let student = enrolled(&harness.service, "s-115");
    let request = harness
        .service
        .submit(&student, "Science", Vec::new())
        .expect("submits");

    let error = harness
        .service
        .reject(&request.id, &staff("t-math"), "  ")
        .expect_err("not the science teacher");
    assert!(matches!(error, ClearanceError::NotDesignatedApprover { .. }));
    assert_eq!(error.kind(), ErrorKind::Forbidden);
}

#[test]
fn reject_records_reason_and_emits_rejection() {
    let harness = harness();
    let student = enrolled(&harness.service, "s-110");
    let request = harness
        .service
        .submit(&student, "Science", Vec::new())
        .expect("submits");

    let decision = harness
        .service
        .reject(&request.id, &staff("t-science"), "  Unpaid lab fee ")
        .expect("rejects");

    assert_eq!(decision.request.rejection_reason(), Some("Unpaid lab fee"));
    assert_eq!(decision.completion.cleared, 0);

    let events = harness.outbox.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].outcome, EventOutcome::Rejected);
    assert_eq!(events[0].reason.as_deref(), Some("Unpaid lab fee"));

    let again = harness
        .service
        .reject(&request.id, &staff("t-science"), "duplicate")
        .expect_err("already rejected");
    assert_eq!(again.kind(), ErrorKind::InvalidState);
}

#[test]
fn direct_clear_resolves_pending_request() {
    let harness = harness();
    let student = enrolled(&harness.service, "s-111");
    let request = harness
        .service
        .submit(&student, "Librarian", Vec::new())
        .expect("submits");

    let cleared = harness
        .service
        .direct_clear(&student, "Librarian", &staff("o-library"))
        .expect("direct clear");

    assert_eq!(cleared.resolved_requests.len(), 1);
    assert_eq!(cleared.resolved_requests[0].id, request.id);
    assert_eq!(cleared.resolved_requests[0].status, RequestStatus::Approved);

    let review = harness.service.review(&request.id).expect("review");
    assert_eq!(review.request.status, RequestStatus::Approved);
    let view = harness.service.student(&student).expect("view");
    assert_eq!(
        view.clearance.get(&RequirementKey::new("Librarian")),
        Some(true)
    );
    assert_eq!(harness.outbox.events().len(), 1);
}

#[test]
fn direct_clear_also_resolves_rejected_requests() {
    let harness = harness();
    let student = enrolled(&harness.service, "s-112");
    let request = harness
        .service
        .submit(&student, "Class Adviser", Vec::new())
        .expect("submits");
    harness
        .service
        .reject(&request.id, &staff("t-adviser"), "Missing community service log")
        .expect("rejects");

    let cleared = harness
        .service
        .direct_clear(&student, "Class Adviser", &staff("t-adviser"))
        .expect("direct clear");

    assert_eq!(cleared.resolved_requests.len(), 1);
    let review = harness.service.review(&request.id).expect("review");
    assert_eq!(review.request.status, RequestStatus::Approved);
    assert!(review.request.rejection_reason().is_none());
}

#[test]
fn approving_resubmission_keeps_earlier_rejection() {
    let harness = harness();
    let student = enrolled(&harness.service, "s-116");
    let first = harness
        .service
        .submit(&student, "Science", Vec::new())
        .expect("first submission");
    let rejected = harness
        .service
        .reject(&first.id, &staff("t-science"), "Missing notebook")
        .expect("rejects");
    let second = harness
        .service
        .submit(&student, "Science", Vec::new())
        .expect("resubmits");

    let decision = harness
        .service
        .approve(&second.id, &staff("t-science"))
        .expect("approves");
    assert_eq!(decision.request.id, second.id);
    assert_eq!(decision.request.status, RequestStatus::Approved);

    let earlier = harness.service.review(&first.id).expect("earlier request");
    assert_eq!(earlier.request.rejection_reason(), Some("Missing notebook"));
    assert_eq!(earlier.request.decided_at, rejected.request.decided_at);
    assert_eq!(earlier.request.decided_by, Some(staff("t-science")));
    let view = harness.service.student(&student).expect("view");
    assert_eq!(
        view.clearance.get(&RequirementKey::new("Science")),
        Some(true)
    );
}

#[test]
fn bulk_approve_reports_per_item_failures() {
    let harness = harness();
    let first = enrolled(&harness.service, "s-113");
    let second = enrolled(&harness.service, "s-114");
    let ok_one = harness
        .service
        .submit(&first, "Math", Vec::new())
        .expect("submits");
    let ok_two = harness
        .service
        .submit(&second, "Math", Vec::new())
        .expect("submits");
    let other_approver = harness
        .service
        .submit(&second, "Science", Vec::new())
        .expect("submits");
    let missing = crate::workflows::clearance::RequestId("cr-unknown".to_string());

    let result = harness.service.bulk_approve(
        &[
            ok_one.id.clone(),
            missing.clone(),
            other_approver.id.clone(),
            ok_two.id.clone(),
        ],
        &staff("t-math"),
    );

    assert_eq!(result.succeeded, vec![ok_one.id, ok_two.id]);
    assert_eq!(result.failed.len(), 2);
    assert_eq!(result.failed[0].request_id, missing);
    assert_eq!(result.failed[0].kind, ErrorKind::NotFound);
    assert_eq!(result.failed[1].request_id, other_approver.id);
    assert_eq!(result.failed[1].kind, ErrorKind::Forbidden);
    assert_eq!(harness.outbox.events().len(), 2);
}

#[test]
fn completion_reaches_100_only_when_every_requirement_cleared() {
    let harness = harness();
    let student = enrolled(&harness.service, "s-115");

    for (index, name) in REQUIREMENTS.iter().enumerate() {
        let cleared = harness
            .service
            .direct_clear(&student, name, &staff("registrar"))
            .expect("clears");
        let expected_full = index + 1 == REQUIREMENTS.len();
        assert_eq!(cleared.completion.fully_cleared, expected_full);
        assert_eq!(cleared.completion.percentage == 100, expected_full);
    }
}
