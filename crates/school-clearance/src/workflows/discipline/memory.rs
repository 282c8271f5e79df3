use std::sync::{Arc, Mutex, MutexGuard};

use super::domain::{DisciplinaryRecord, ViolationClass};
use super::repository::{DisciplinaryRecordStore, OffenseHistory};
use crate::workflows::{StoreError, StudentId};

/// Process-local disciplinary log.
#[derive(Debug, Default, Clone)]
pub struct InMemoryDisciplinaryStore {
    records: Arc<Mutex<Vec<DisciplinaryRecord>>>,
}

impl InMemoryDisciplinaryStore {
    fn lock(&self) -> Result<MutexGuard<'_, Vec<DisciplinaryRecord>>, StoreError> {
        self.records
            .lock()
            .map_err(|_| StoreError::Unavailable("disciplinary log lock poisoned".to_string()))
    }
}

/// Offense counts over an already locked log.
struct LockedLog<'a>(&'a [DisciplinaryRecord]);

impl OffenseHistory for LockedLog<'_> {
    fn count_by_student_and_class(
        &self,
        student_id: &StudentId,
        class: ViolationClass,
    ) -> Result<u32, StoreError> {
        Ok(self
            .0
            .iter()
            .filter(|record| &record.student_id == student_id && record.involves(class))
            .count() as u32)
    }
}

fn push_unique(
    log: &mut Vec<DisciplinaryRecord>,
    record: DisciplinaryRecord,
) -> Result<DisciplinaryRecord, StoreError> {
    if log.iter().any(|existing| existing.id == record.id) {
        return Err(StoreError::Conflict(record.id.0));
    }
    log.push(record.clone());
    Ok(record)
}

impl OffenseHistory for InMemoryDisciplinaryStore {
    fn count_by_student_and_class(
        &self,
        student_id: &StudentId,
        class: ViolationClass,
    ) -> Result<u32, StoreError> {
        let guard = self.lock()?;
        LockedLog(guard.as_slice()).count_by_student_and_class(student_id, class)
    }
}

impl DisciplinaryRecordStore for InMemoryDisciplinaryStore {
    fn append(&self, record: DisciplinaryRecord) -> Result<DisciplinaryRecord, StoreError> {
        let mut guard = self.lock()?;
        push_unique(&mut guard, record)
    }

    fn append_with<F, E>(&self, build: F) -> Result<DisciplinaryRecord, E>
    where
        F: FnOnce(&dyn OffenseHistory) -> Result<DisciplinaryRecord, E>,
        E: From<StoreError>,
    {
        let mut guard = self.lock()?;
        let record = build(&LockedLog(guard.as_slice()))?;
        Ok(push_unique(&mut guard, record)?)
    }

    fn records_for(&self, student_id: &StudentId) -> Result<Vec<DisciplinaryRecord>, StoreError> {
        let guard = self.lock()?;
        Ok(guard
            .iter()
            .filter(|record| &record.student_id == student_id)
            .cloned()
            .collect())
    }
}
