use super::domain::{DisciplinaryRecord, ViolationClass};
use crate::workflows::{StoreError, StudentId};

/// Read port over a student's offense history.
pub trait OffenseHistory {
    /// Number of past records containing at least one violation of `class`.
    fn count_by_student_and_class(
        &self,
        student_id: &StudentId,
        class: ViolationClass,
    ) -> Result<u32, StoreError>;
}

/// Append-only disciplinary log.
pub trait DisciplinaryRecordStore: OffenseHistory + Send + Sync {
    fn append(&self, record: DisciplinaryRecord) -> Result<DisciplinaryRecord, StoreError>;

    /// Build a record from the current history and append it as one step. No other
    /// append for any student can land between the read and the write.
    fn append_with<F, E>(&self, build: F) -> Result<DisciplinaryRecord, E>
    where
        F: FnOnce(&dyn OffenseHistory) -> Result<DisciplinaryRecord, E>,
        E: From<StoreError>;

    fn records_for(&self, student_id: &StudentId) -> Result<Vec<DisciplinaryRecord>, StoreError>;

    fn count_for_student(&self, student_id: &StudentId) -> Result<u32, StoreError> {
        Ok(self.records_for(student_id)?.len() as u32)
    }
}

/// Existence check against the roster without owning it.
pub trait StudentLookup: Send + Sync {
    fn student_exists(&self, student_id: &StudentId) -> Result<bool, StoreError>;
}

/// Offense counts for a single, already-known student. Used for ad-hoc previews.
impl OffenseHistory for std::collections::BTreeMap<ViolationClass, u32> {
    fn count_by_student_and_class(
        &self,
        _student_id: &StudentId,
        class: ViolationClass,
    ) -> Result<u32, StoreError> {
        Ok(self.get(&class).copied().unwrap_or(0))
    }
}
