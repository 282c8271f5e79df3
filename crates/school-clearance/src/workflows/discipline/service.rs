use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use super::domain::{
    DisciplinaryRecord, DisciplinaryRecordId, NewDisciplinaryRecord, ViolationId,
};
use super::repository::{DisciplinaryRecordStore, StudentLookup};
use super::resolver::{EscalationResolver, SanctionProposal};
use crate::workflows::{StoreError, StudentId};

/// Error raised by the disciplinary service.
#[derive(Debug, thiserror::Error)]
pub enum DisciplineError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("violation '{0}' is not in the catalog")]
    UnknownViolation(ViolationId),
    #[error("student '{0}' not found")]
    StudentNotFound(StudentId),
    #[error(transparent)]
    Store(#[from] StoreError),
}

static RECORD_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_record_id() -> DisciplinaryRecordId {
    let id = RECORD_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    DisciplinaryRecordId(format!("dr-{id:06}"))
}

/// Records violations and proposes escalated sanctions from the student's history.
pub struct DisciplinaryService<L, D> {
    resolver: Arc<EscalationResolver>,
    students: Arc<L>,
    records: Arc<D>,
}

impl<L, D> DisciplinaryService<L, D>
where
    L: StudentLookup + 'static,
    D: DisciplinaryRecordStore + 'static,
{
    pub fn new(students: Arc<L>, records: Arc<D>, resolver: EscalationResolver) -> Self {
        Self {
            resolver: Arc::new(resolver),
            students,
            records,
        }
    }

    pub fn resolver(&self) -> &EscalationResolver {
        &self.resolver
    }

    /// Propose sanctions without writing anything.
    pub fn preview(
        &self,
        student_id: &StudentId,
        violations: &[ViolationId],
    ) -> Result<SanctionProposal, DisciplineError> {
        self.ensure_student(student_id)?;
        let proposal = self
            .resolver
            .resolve(self.records.as_ref(), student_id, violations)?;
        debug!(
            student = %student_id,
            classes = proposal.classes.len(),
            "sanction preview resolved"
        );
        Ok(proposal)
    }

    /// Resolve defaults, apply the recorder's override, and append the record.
    pub fn record(
        &self,
        new_record: NewDisciplinaryRecord,
    ) -> Result<DisciplinaryRecord, DisciplineError> {
        let NewDisciplinaryRecord {
            student_id,
            date,
            violations,
            witnesses,
            location,
            evidence,
            recorded_by,
            sanction_override,
        } = new_record;

        self.ensure_student(&student_id)?;
        let stored = self.records.append_with(|history| {
            let proposal = self.resolver.resolve(history, &student_id, &violations)?;
            let classes = proposal
                .classes
                .iter()
                .map(|resolution| resolution.class)
                .collect();
            let sanctions = sanction_override.apply(proposal.sanctions());

            Ok::<_, DisciplineError>(DisciplinaryRecord {
                id: next_record_id(),
                student_id,
                date,
                violations,
                classes,
                sanctions,
                witnesses,
                location,
                evidence,
                recorded_by,
                recorded_at: Utc::now(),
            })
        })?;
        info!(
            record = %stored.id.0,
            student = %stored.student_id,
            sanctions = ?stored.sanctions,
            "disciplinary record appended"
        );
        Ok(stored)
    }

    /// The student's records ordered by incident date.
    pub fn history(
        &self,
        student_id: &StudentId,
    ) -> Result<Vec<DisciplinaryRecord>, DisciplineError> {
        self.ensure_student(student_id)?;
        let mut records = self.records.records_for(student_id)?;
        records.sort_by(|left, right| {
            left.date
                .cmp(&right.date)
                .then_with(|| left.recorded_at.cmp(&right.recorded_at))
        });
        Ok(records)
    }

    fn ensure_student(&self, student_id: &StudentId) -> Result<(), DisciplineError> {
        if self.students.student_exists(student_id)? {
            Ok(())
        } else {
            Err(DisciplineError::StudentNotFound(student_id.clone()))
        }
    }
}
