use std::collections::BTreeMap;

use super::common::*;
use crate::workflows::discipline::{
    DisciplineError, EscalationResolver, OffenseOverflowPolicy, Sanction, SanctionOverride,
    SanctionTable, ViolationClass,
};

fn counts(entries: &[(ViolationClass, u32)]) -> BTreeMap<ViolationClass, u32> {
    entries.iter().copied().collect()
}

fn labels(sanctions: &[Sanction]) -> Vec<&str> {
    sanctions.iter().map(Sanction::label).collect()
}

#[test]
fn first_offense_gets_lowest_tier() {
    let resolver = EscalationResolver::default();
    let proposal = resolver
        .resolve(&counts(&[]), &student("s-100"), &violations(&["A1"]))
        .expect("resolves");

    assert_eq!(proposal.classes.len(), 1);
    assert_eq!(proposal.classes[0].prior_offenses, 0);
    assert_eq!(labels(&proposal.sanctions()), vec!["Oral Warning"]);
}

#[test]
fn prior_offenses_escalate_along_the_ladder() {
    let resolver = EscalationResolver::default();
    let proposal = resolver
        .resolve(
            &counts(&[(ViolationClass::B, 2)]),
            &student("s-100"),
            &violations(&["B1"]),
        )
        .expect("resolves");
    assert_eq!(labels(&proposal.sanctions()), vec!["Suspension (5 days)"]);

    let proposal = resolver
        .resolve(
            &counts(&[(ViolationClass::B, 3)]),
            &student("s-100"),
            &violations(&["B1"]),
        )
        .expect("resolves");
    assert_eq!(labels(&proposal.sanctions()), vec!["Exclusion"]);
    assert!(!proposal.classes[0].beyond_ladder);

    let proposal = resolver
        .resolve(
            &counts(&[(ViolationClass::A, 4)]),
            &student("s-100"),
            &violations(&["A2"]),
        )
        .expect("resolves");
    assert_eq!(labels(&proposal.sanctions()), vec!["Exclusion"]);
    assert!(!proposal.classes[0].beyond_ladder);
}

#[test]
fn overflow_clamps_to_harshest_by_default() {
    let resolver = EscalationResolver::default();
    let proposal = resolver
        .resolve(
            &counts(&[(ViolationClass::B, 6)]),
            &student("s-100"),
            &violations(&["B2"]),
        )
        .expect("resolves");

    assert!(proposal.classes[0].beyond_ladder);
    assert_eq!(labels(&proposal.sanctions()), vec!["Exclusion"]);
}

#[test]
fn overflow_can_omit_the_class() {
    let resolver = EscalationResolver::standard(OffenseOverflowPolicy::Omit);
    let proposal = resolver
        .resolve(
            &counts(&[(ViolationClass::B, 4), (ViolationClass::A, 1)]),
            &student("s-100"),
            &violations(&["A1", "B2"]),
        )
        .expect("resolves");

    let b = proposal
        .classes
        .iter()
        .find(|resolution| resolution.class == ViolationClass::B)
        .expect("class B resolved");
    assert!(b.beyond_ladder);
    assert_eq!(b.sanction, None);
    assert_eq!(labels(&proposal.sanctions()), vec!["Written Warning"]);
}

#[test]
fn multi_class_violation_counts_each_class_independently() {
    let resolver = EscalationResolver::default();
    let proposal = resolver
        .resolve(
            &counts(&[(ViolationClass::D, 1)]),
            &student("s-100"),
            &violations(&["DE1"]),
        )
        .expect("resolves");

    let classes: Vec<_> = proposal
        .classes
        .iter()
        .map(|resolution| (resolution.class, resolution.prior_offenses))
        .collect();
    assert_eq!(
        classes,
        vec![(ViolationClass::D, 1), (ViolationClass::E, 0)]
    );
    assert_eq!(labels(&proposal.sanctions()), vec!["Exclusion", "Exclusion"]);
}

#[test]
fn selection_in_same_class_resolves_once() {
    let resolver = EscalationResolver::default();
    let proposal = resolver
        .resolve(&counts(&[]), &student("s-100"), &violations(&["A1", "A2", "A3"]))
        .expect("resolves");

    assert_eq!(proposal.classes.len(), 1);
    assert_eq!(labels(&proposal.sanctions()), vec!["Oral Warning"]);
}

#[test]
fn empty_selection_is_invalid() {
    let resolver = EscalationResolver::default();
    let error = resolver
        .resolve(&counts(&[]), &student("s-100"), &[])
        .expect_err("empty selection");
    assert!(matches!(error, DisciplineError::Validation(_)));
}

#[test]
fn unknown_violation_is_rejected() {
    let resolver = EscalationResolver::default();
    let error = resolver
        .resolve(&counts(&[]), &student("s-100"), &violations(&["A1", "Q9"]))
        .expect_err("unknown id");
    assert!(matches!(error, DisciplineError::UnknownViolation(ref id) if id.0 == "Q9"));
}

#[test]
fn sanction_table_ladders() {
    let table = SanctionTable::standard();
    assert_eq!(table.ladder(ViolationClass::E).len(), 1);
    assert_eq!(
        table
            .sanction_for(ViolationClass::F, 0, OffenseOverflowPolicy::Omit)
            .map(Sanction::label),
        Some("Expulsion")
    );
    assert_eq!(
        table.sanction_for(ViolationClass::C, 3, OffenseOverflowPolicy::Omit),
        None
    );
    assert_eq!(
        table
            .sanction_for(ViolationClass::C, 3, OffenseOverflowPolicy::ClampToHarshest)
            .map(Sanction::label),
        Some("Exclusion")
    );
}

#[test]
fn overrides_adjust_proposed_sanctions() {
    let proposed = vec![Sanction::new("Written Warning"), Sanction::new("Suspension (3 days)")];

    assert_eq!(
        SanctionOverride::UseProposed.apply(proposed.clone()),
        proposed
    );
    assert_eq!(
        SanctionOverride::Replace {
            sanctions: vec![Sanction::new("Community Service")],
        }
        .apply(proposed.clone()),
        vec![Sanction::new("Community Service")]
    );
    assert_eq!(
        SanctionOverride::Adjust {
            add: vec![Sanction::new("Parent Conference")],
            remove: vec![Sanction::new("Suspension (3 days)")],
        }
        .apply(proposed),
        vec![
            Sanction::new("Written Warning"),
            Sanction::new("Parent Conference")
        ]
    );
}
