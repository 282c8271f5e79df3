use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::catalog::ViolationCatalog;
use super::domain::{Sanction, ViolationClass, ViolationId};
use super::repository::OffenseHistory;
use super::sanctions::{OffenseOverflowPolicy, SanctionTable};
use super::service::DisciplineError;
use crate::workflows::StudentId;

/// Outcome of resolving one class touched by the selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassResolution {
    pub class: ViolationClass,
    pub prior_offenses: u32,
    pub sanction: Option<Sanction>,
    /// The offense ordinal ran past the ladder.
    pub beyond_ladder: bool,
}

/// Default sanctions proposed for a selection; the recorder may still override them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanctionProposal {
    pub student_id: StudentId,
    pub classes: Vec<ClassResolution>,
}

impl SanctionProposal {
    /// Union across classes in class order. Duplicates are kept.
    pub fn sanctions(&self) -> Vec<Sanction> {
        self.classes
            .iter()
            .filter_map(|resolution| resolution.sanction.clone())
            .collect()
    }
}

/// Stateless resolver; history is supplied per call so previews never touch storage writes.
#[derive(Debug, Clone)]
pub struct EscalationResolver {
    catalog: Arc<ViolationCatalog>,
    table: Arc<SanctionTable>,
    policy: OffenseOverflowPolicy,
}

impl EscalationResolver {
    pub fn new(
        catalog: ViolationCatalog,
        table: SanctionTable,
        policy: OffenseOverflowPolicy,
    ) -> Self {
        Self {
            catalog: Arc::new(catalog),
            table: Arc::new(table),
            policy,
        }
    }

    pub fn standard(policy: OffenseOverflowPolicy) -> Self {
        Self::new(ViolationCatalog::standard(), SanctionTable::standard(), policy)
    }

    pub fn catalog(&self) -> &ViolationCatalog {
        &self.catalog
    }

    pub fn table(&self) -> &SanctionTable {
        &self.table
    }

    pub fn policy(&self) -> OffenseOverflowPolicy {
        self.policy
    }

    pub fn resolve<H>(
        &self,
        history: &H,
        student_id: &StudentId,
        selection: &[ViolationId],
    ) -> Result<SanctionProposal, DisciplineError>
    where
        H: OffenseHistory + ?Sized,
    {
        if selection.is_empty() {
            return Err(DisciplineError::Validation(
                "at least one violation must be selected".to_string(),
            ));
        }

        let classes = self
            .catalog
            .classes_for(selection)
            .map_err(DisciplineError::UnknownViolation)?;

        let mut resolutions = Vec::with_capacity(classes.len());
        for class in classes {
            let prior_offenses = history.count_by_student_and_class(student_id, class)?;
            let beyond_ladder = prior_offenses as usize >= self.table.ladder(class).len();
            let sanction = self
                .table
                .sanction_for(class, prior_offenses, self.policy)
                .cloned();

            resolutions.push(ClassResolution {
                class,
                prior_offenses,
                sanction,
                beyond_ladder,
            });
        }

        Ok(SanctionProposal {
            student_id: student_id.clone(),
            classes: resolutions,
        })
    }
}

impl Default for EscalationResolver {
    fn default() -> Self {
        Self::standard(OffenseOverflowPolicy::default())
    }
}
