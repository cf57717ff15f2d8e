use chrono::NaiveDate;
use haven_intake::workflows::intake::{IntakeId, WorkflowRecord, WorkflowRepository};
use haven_intake::workflows::psde::{FamilyId, PsdeRepository, RecordFamily, RecordId};
use haven_intake::workflows::repository::RepositoryError;
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryWorkflowRepository {
    records: Arc<Mutex<HashMap<IntakeId, WorkflowRecord>>>,
}

impl WorkflowRepository for InMemoryWorkflowRepository {
    fn insert(&self, record: WorkflowRecord) -> Result<WorkflowRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&record.intake_id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.intake_id.clone(), record.clone());
        Ok(record)
    }

    fn update(
        &self,
        record: WorkflowRecord,
        expected_revision: u64,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let stored = guard
            .get(&record.intake_id)
            .ok_or(RepositoryError::NotFound)?;
        if stored.revision != expected_revision {
            return Err(RepositoryError::VersionConflict {
                expected: expected_revision,
                actual: stored.revision,
            });
        }
        guard.insert(record.intake_id.clone(), record);
        Ok(())
    }

    fn fetch(&self, id: &IntakeId) -> Result<Option<WorkflowRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn open_intakes(&self, limit: usize) -> Result<Vec<WorkflowRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        let mut open: Vec<_> = guard
            .values()
            .filter(|record| !record.is_submitted())
            .cloned()
            .collect();
        open.sort_by(|left, right| left.created_on.cmp(&right.created_on));
        open.truncate(limit);
        Ok(open)
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryPsdeRepository {
    families: Arc<Mutex<HashMap<FamilyId, RecordFamily>>>,
}

impl PsdeRepository for InMemoryPsdeRepository {
    fn insert(&self, family: RecordFamily) -> Result<RecordFamily, RepositoryError> {
        let mut guard = self.families.lock().expect("repository mutex poisoned");
        if guard.contains_key(&family.family_id()) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(family.family_id(), family.clone());
        Ok(family)
    }

    fn update(&self, family: RecordFamily, expected_revision: u64) -> Result<(), RepositoryError> {
        let mut guard = self.families.lock().expect("repository mutex poisoned");
        let stored = guard
            .get(&family.family_id())
            .ok_or(RepositoryError::NotFound)?;
        if stored.revision() != expected_revision {
            return Err(RepositoryError::VersionConflict {
                expected: expected_revision,
                actual: stored.revision(),
            });
        }
        guard.insert(family.family_id(), family);
        Ok(())
    }

    fn fetch(&self, id: &FamilyId) -> Result<Option<RecordFamily>, RepositoryError> {
        let guard = self.families.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn find_by_record(&self, id: &RecordId) -> Result<Option<RecordFamily>, RepositoryError> {
        let guard = self.families.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .find(|family| family.record(*id).is_some())
            .cloned())
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
