use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use super::domain::{ClearanceRequest, RequestId, RequirementKey, Student};
use super::repository::{
    ClearanceEvent, ClearanceStore, ClearanceTransaction, NotificationEmitter, NotificationError,
    ParticipationLedger, RequestStore, RequestTransition, StudentStore,
};
use crate::workflows::discipline::StudentLookup;
use crate::workflows::{StaffId, StoreError, StudentId};

#[derive(Debug, Default, Clone)]
struct ClearanceTables {
    students: HashMap<StudentId, Student>,
    requests: BTreeMap<RequestId, ClearanceRequest>,
}

impl StudentStore for ClearanceTables {
    fn get(&self, id: &StudentId) -> Result<Option<Student>, StoreError> {
        Ok(self.students.get(id).cloned())
    }

    fn insert(&mut self, student: Student) -> Result<Student, StoreError> {
        if self.students.contains_key(&student.id) {
            return Err(StoreError::Conflict(student.id.0));
        }
        self.students.insert(student.id.clone(), student.clone());
        Ok(student)
    }

    fn set_clearance_flag(
        &mut self,
        id: &StudentId,
        key: &RequirementKey,
        cleared: bool,
    ) -> Result<(), StoreError> {
        let student = self
            .students
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.0.clone()))?;
        student.clearance.set(key.clone(), cleared);
        Ok(())
    }

    fn reset_clearance(&mut self, id: &StudentId, grade_level: &str) -> Result<(), StoreError> {
        let student = self
            .students
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.0.clone()))?;
        student.grade_level = grade_level.to_string();
        student.clearance.clear();
        Ok(())
    }

    fn list_by_section(&self, section: &str) -> Result<Vec<Student>, StoreError> {
        let mut students: Vec<Student> = self
            .students
            .values()
            .filter(|student| student.section == section)
            .cloned()
            .collect();
        students.sort_by(|left, right| left.id.cmp(&right.id));
        Ok(students)
    }
}

impl RequestStore for ClearanceTables {
    fn create(&mut self, request: ClearanceRequest) -> Result<ClearanceRequest, StoreError> {
        if self.requests.contains_key(&request.id) {
            return Err(StoreError::Conflict(request.id.0));
        }
        self.requests.insert(request.id.clone(), request.clone());
        Ok(request)
    }

    fn get(&self, id: &RequestId) -> Result<Option<ClearanceRequest>, StoreError> {
        Ok(self.requests.get(id).cloned())
    }

    fn update(
        &mut self,
        id: &RequestId,
        transition: RequestTransition,
    ) -> Result<ClearanceRequest, StoreError> {
        let request = self
            .requests
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.0.clone()))?;
        if request.version != transition.expected_version {
            return Err(StoreError::StaleVersion {
                id: id.0.clone(),
                expected: transition.expected_version,
                found: request.version,
            });
        }

        request.status = transition.status;
        request.decided_at = Some(transition.decided_at);
        request.decided_by = Some(transition.decided_by);
        request.version += 1;
        Ok(request.clone())
    }

    fn find_pending(
        &self,
        student_id: &StudentId,
        key: &RequirementKey,
    ) -> Result<Option<ClearanceRequest>, StoreError> {
        Ok(self
            .requests
            .values()
            .find(|request| {
                request.is_pending()
                    && &request.student_id == student_id
                    && &request.requirement_key == key
            })
            .cloned())
    }

    fn find_for_requirement(
        &self,
        student_id: &StudentId,
        key: &RequirementKey,
    ) -> Result<Vec<ClearanceRequest>, StoreError> {
        Ok(self
            .requests
            .values()
            .filter(|request| &request.student_id == student_id && &request.requirement_key == key)
            .cloned()
            .collect())
    }

    fn pending_for_approver(&self, approver: &StaffId) -> Result<Vec<ClearanceRequest>, StoreError> {
        Ok(self
            .requests
            .values()
            .filter(|request| request.is_pending() && &request.approver_id == approver)
            .cloned()
            .collect())
    }
}

impl ClearanceTransaction for ClearanceTables {
    fn students(&mut self) -> &mut dyn StudentStore {
        self
    }

    fn requests(&mut self) -> &mut dyn RequestStore {
        self
    }
}

/// Process-local store. Transactions run one at a time against a working copy that
/// replaces the committed tables only on success.
#[derive(Debug, Default, Clone)]
pub struct InMemoryClearanceStore {
    tables: Arc<Mutex<ClearanceTables>>,
}

impl ClearanceStore for InMemoryClearanceStore {
    fn transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn ClearanceTransaction) -> Result<T, E>,
        E: From<StoreError>,
    {
        let mut committed = self.tables.lock().map_err(|_| {
            E::from(StoreError::Unavailable(
                "clearance store lock poisoned".to_string(),
            ))
        })?;
        let mut working = committed.clone();
        let outcome = work(&mut working)?;
        *committed = working;
        Ok(outcome)
    }
}

impl StudentLookup for InMemoryClearanceStore {
    fn student_exists(&self, student_id: &StudentId) -> Result<bool, StoreError> {
        let tables = self
            .tables
            .lock()
            .map_err(|_| StoreError::Unavailable("clearance store lock poisoned".to_string()))?;
        Ok(tables.students.contains_key(student_id))
    }
}

/// Collects emitted events; useful for demos and for asserting delivery.
#[derive(Debug, Default, Clone)]
pub struct InMemoryNotificationOutbox {
    events: Arc<Mutex<Vec<ClearanceEvent>>>,
}

impl InMemoryNotificationOutbox {
    pub fn events(&self) -> Vec<ClearanceEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl NotificationEmitter for InMemoryNotificationOutbox {
    fn emit(&self, event: ClearanceEvent) -> Result<(), NotificationError> {
        self.events
            .lock()
            .map_err(|_| NotificationError::Transport("outbox lock poisoned".to_string()))?
            .push(event);
        Ok(())
    }
}

/// Fixed participation counts per student.
#[derive(Debug, Default, Clone)]
pub struct InMemoryParticipationLedger {
    counts: Arc<Mutex<HashMap<StudentId, u32>>>,
}

impl InMemoryParticipationLedger {
    pub fn record(&self, student_id: StudentId, events_attended: u32) {
        if let Ok(mut counts) = self.counts.lock() {
            *counts.entry(student_id).or_insert(0) += events_attended;
        }
    }
}

impl ParticipationLedger for InMemoryParticipationLedger {
    fn participation_count(&self, student_id: &StudentId) -> Result<u32, StoreError> {
        let counts = self
            .counts
            .lock()
            .map_err(|_| StoreError::Unavailable("participation lock poisoned".to_string()))?;
        Ok(counts.get(student_id).copied().unwrap_or(0))
    }
}
