use crate::infra::{
    build_resolver, default_requirement_catalog, parse_class_counts, parse_violation_id,
};
use chrono::{Duration, Local, NaiveDate};
use clap::Args;
use school_clearance::config::{parse_overflow_policy, AppConfig, ClearanceConfig};
use school_clearance::error::AppError;
use school_clearance::workflows::clearance::{
    ClearanceService, Completion, Enrollment, EventOutcome, InMemoryClearanceStore,
    InMemoryNotificationOutbox, InMemoryParticipationLedger, RequestId,
};
use school_clearance::workflows::discipline::{
    DisciplinaryService, InMemoryDisciplinaryStore, NewDisciplinaryRecord, OffenseOverflowPolicy,
    Sanction, SanctionOverride, SanctionProposal, ViolationClass, ViolationId,
};
use school_clearance::workflows::{StaffId, StudentId};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct SanctionArgs {
    /// Prior offenses per class, e.g. `A=2,B=0`. Classes left out count as zero.
    #[arg(long, value_parser = parse_class_counts)]
    pub(crate) class_counts: Option<BTreeMap<ViolationClass, u32>>,
    /// Comma separated violation ids, e.g. `A1,DE1`
    #[arg(long, required = true, value_delimiter = ',', value_parser = parse_violation_id)]
    pub(crate) violations: Vec<ViolationId>,
    /// What happens past the end of a ladder: `clamp` or `omit`
    #[arg(long, value_parser = parse_overflow_policy)]
    pub(crate) offense_overflow: Option<OffenseOverflowPolicy>,
    /// CSV violation catalog replacing the built-in handbook
    #[arg(long)]
    pub(crate) catalog: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// What happens past the end of a ladder: `clamp` or `omit`
    #[arg(long, value_parser = parse_overflow_policy)]
    pub(crate) offense_overflow: Option<OffenseOverflowPolicy>,
    /// Incident date for the first disciplinary record (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = parse_date)]
    pub(crate) incident_date: Option<NaiveDate>,
    /// Skip the disciplinary escalation portion of the demo.
    #[arg(long)]
    pub(crate) skip_discipline: bool,
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

fn clearance_config(
    offense_overflow: Option<OffenseOverflowPolicy>,
    catalog: Option<PathBuf>,
) -> Result<ClearanceConfig, AppError> {
    let mut config = AppConfig::load()?.clearance;
    if let Some(policy) = offense_overflow {
        config.offense_overflow = policy;
    }
    if catalog.is_some() {
        config.violation_catalog = catalog;
    }
    Ok(config)
}

pub(crate) fn run_sanction_preview(args: SanctionArgs) -> Result<(), AppError> {
    let SanctionArgs {
        class_counts,
        violations,
        offense_overflow,
        catalog,
    } = args;

    let config = clearance_config(offense_overflow, catalog)?;
    let resolver = build_resolver(&config)?;
    let history = class_counts.unwrap_or_default();
    let proposal = resolver.resolve(&history, &StudentId("ad-hoc".to_string()), &violations)?;

    println!("Sanction preview (overflow policy {:?})", resolver.policy());
    for id in &violations {
        if let Some(violation) = resolver.catalog().get(id) {
            let classes: Vec<_> = violation.classes.iter().map(|class| class.letter()).collect();
            println!(
                "- {} {} [{}]",
                violation.id,
                violation.description,
                classes.join("/")
            );
        }
    }
    render_proposal(&proposal);
    Ok(())
}

fn render_proposal(proposal: &SanctionProposal) {
    for resolution in &proposal.classes {
        let sanction = resolution
            .sanction
            .as_ref()
            .map(Sanction::label)
            .unwrap_or("no default sanction");
        println!(
            "  {} offense #{} -> {}{}",
            resolution.class,
            resolution.prior_offenses + 1,
            sanction,
            if resolution.beyond_ladder {
                " (past end of ladder)"
            } else {
                ""
            }
        );
    }
    let sanctions: Vec<_> = proposal.sanctions().iter().map(|s| s.to_string()).collect();
    if sanctions.is_empty() {
        println!("  Proposed sanctions: none");
    } else {
        println!("  Proposed sanctions: {}", sanctions.join(", "));
    }
}

fn render_completion(label: &str, completion: &Completion) {
    println!(
        "  {}: {}/{} cleared ({}%){}",
        label,
        completion.cleared,
        completion.total,
        completion.percentage,
        if completion.fully_cleared {
            " - fully cleared"
        } else {
            ""
        }
    );
}

fn staff(id: &str) -> StaffId {
    StaffId(id.to_string())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        offense_overflow,
        incident_date,
        skip_discipline,
    } = args;

    let config = clearance_config(offense_overflow, None)?;
    let store = Arc::new(InMemoryClearanceStore::default());
    let records = Arc::new(InMemoryDisciplinaryStore::default());
    let outbox = Arc::new(InMemoryNotificationOutbox::default());
    let participation = Arc::new(InMemoryParticipationLedger::default());
    let clearance = ClearanceService::new(
        store.clone(),
        records.clone(),
        outbox.clone(),
        default_requirement_catalog(),
    )
    .with_participation(participation.clone());

    println!("School clearance demo");
    let student = clearance.enroll(Enrollment {
        id: StudentId("2024-0417".to_string()),
        section: "Rizal".to_string(),
        education_level: "Junior High".to_string(),
        grade_level: "Grade 10".to_string(),
    })?;
    participation.record(student.id.clone(), 6);
    let view = clearance.assign_requirements(
        &student.id,
        &[
            "English",
            "Mathematics",
            "Library",
            "Guidance Office",
            "Class Adviser",
        ],
    )?;
    println!(
        "- Enrolled {} in {} ({}) with {} requirements",
        student.id,
        view.section,
        view.grade_level,
        view.clearance.len()
    );

    if !skip_discipline {
        let discipline = DisciplinaryService::new(
            store.clone(),
            records.clone(),
            build_resolver(&config)?,
        );
        let first_incident = incident_date.unwrap_or_else(|| Local::now().date_naive());

        println!("\nDisciplinary escalation");
        for (offset, violation) in ["A2", "A2", "DE1"].into_iter().enumerate() {
            let record = discipline.record(NewDisciplinaryRecord {
                student_id: student.id.clone(),
                date: first_incident + Duration::days(offset as i64 * 7),
                violations: vec![ViolationId(violation.to_string())],
                witnesses: vec!["Gate guard".to_string()],
                location: "Main gate".to_string(),
                evidence: None,
                recorded_by: Some(staff("o-guidance")),
                sanction_override: SanctionOverride::UseProposed,
            })?;
            let sanctions: Vec<_> = record.sanctions.iter().map(|s| s.to_string()).collect();
            println!(
                "- {} on {}: {} -> {}",
                record.id.0,
                record.date,
                violation,
                sanctions.join(", ")
            );
        }

        println!("Next offense preview for A1 + B1:");
        let proposal = discipline.preview(
            &student.id,
            &[ViolationId("A1".to_string()), ViolationId("B1".to_string())],
        )?;
        render_proposal(&proposal);
    }

    println!("\nClearance requests");
    let english = clearance.submit(&student.id, "English", Vec::new())?;
    let library = clearance.submit(&student.id, "Library", Vec::new())?;
    let adviser = clearance.submit(&student.id, "Class Adviser", Vec::new())?;
    println!(
        "- Submitted {}, {}, {}",
        english.requirement_key, library.requirement_key, adviser.requirement_key
    );

    let review = clearance.review(&adviser.id)?;
    println!(
        "- Adviser review: {} disciplinary records, {} events attended",
        review.disciplinary_records,
        review.participation_count.unwrap_or(0)
    );

    let rejected = clearance.reject(&library.id, &staff("o-library"), "Two books overdue")?;
    println!(
        "- Library returned: {}",
        rejected.request.rejection_reason().unwrap_or_default()
    );
    let resubmitted = clearance.submit(&student.id, "Library", Vec::new())?;
    let decision = clearance.approve(&resubmitted.id, &staff("o-library"))?;
    render_completion("Library resubmission approved", &decision.completion);

    let decision = clearance.approve(&english.id, &staff("t-english"))?;
    render_completion("English approved", &decision.completion);

    match clearance.approve(&adviser.id, &staff("t-english")) {
        Ok(_) => println!("  Unexpected approval by a non-designated approver"),
        Err(err) => println!("  Adviser approval by t-english refused: {}", err),
    }

    let cleared = clearance.direct_clear(&student.id, "Mathematics", &staff("t-math"))?;
    render_completion("Mathematics cleared directly", &cleared.completion);

    let guidance = clearance.submit(&student.id, "Guidance Office", Vec::new())?;
    let bulk = clearance.bulk_approve(
        &[
            guidance.id.clone(),
            RequestId("cr-missing".to_string()),
        ],
        &staff("o-guidance"),
    );
    println!(
        "- Bulk approval: {} succeeded, {} failed",
        bulk.succeeded.len(),
        bulk.failed.len()
    );
    for failure in &bulk.failed {
        println!("  - {}: {}", failure.request_id, failure.reason);
    }

    let decision = clearance.approve(&adviser.id, &staff("t-adviser"))?;
    render_completion("Class adviser approved", &decision.completion);

    let report = clearance.section_report("Rizal")?;
    println!(
        "\nSection {}: {} students, {} fully cleared, average {:.0}%",
        report.section, report.students, report.fully_cleared, report.average_completion
    );
    if let Some(top) = report.bottlenecks.first() {
        println!(
            "Most owed requirement: {} ({} students)",
            top.requirement_key, top.outstanding
        );
    }

    let events = outbox.events();
    println!("\nNotifications ({})", events.len());
    for event in events {
        let outcome = match event.outcome {
            EventOutcome::Approved => "approved",
            EventOutcome::Rejected => "rejected",
        };
        println!(
            "- {} {} {}{}",
            event.student_id,
            event.requirement_key,
            outcome,
            event
                .reason
                .map(|reason| format!(" ({reason})"))
                .unwrap_or_default()
        );
    }

    Ok(())
}
