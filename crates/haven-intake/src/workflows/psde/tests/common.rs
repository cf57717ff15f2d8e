use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

pub(crate) use crate::workflows::intake::tests::common::read_json_body;

use crate::workflows::codes::{DomesticViolenceRecency, DvRedactionLevel, HmisResponse};
use crate::workflows::psde::access::{AccessPolicy, ViewerContext};
use crate::workflows::psde::correction::{CorrectionRequest, RecordFamily};
use crate::workflows::psde::domain::{CorrectionReason, FamilyId, PsdePayload, RecordId};
use crate::workflows::psde::repository::PsdeRepository;
use crate::workflows::psde::service::PsdeService;
use crate::workflows::repository::RepositoryError;

pub(crate) fn now() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2025-03-10T15:30:00Z")
        .expect("timestamp")
        .with_timezone(&Utc)
}

pub(crate) fn caseworker() -> ViewerContext {
    ViewerContext::new("amy", ["CASE_MANAGER"])
}

pub(crate) fn specialist() -> ViewerContext {
    ViewerContext::new("dana", ["DV_SPECIALIST"])
}

pub(crate) fn supervisor() -> ViewerContext {
    ViewerContext::new("sam", ["SUPERVISOR", "DATA_MANAGER"])
}

/// Survivor disclosure restricted to DV specialists.
pub(crate) fn payload() -> PsdePayload {
    PsdePayload {
        information_date: Some(now().date_naive()),
        collected_by: "amy".to_string(),
        income_from_any_source: HmisResponse::Yes,
        total_monthly_income: Some(1_200),
        covered_by_health_insurance: HmisResponse::No,
        physical_disability: HmisResponse::No,
        developmental_disability: HmisResponse::No,
        chronic_health_condition: HmisResponse::No,
        hiv_aids: HmisResponse::No,
        mental_health_disorder: HmisResponse::Yes,
        substance_use_disorder: HmisResponse::No,
        domestic_violence: HmisResponse::Yes,
        domestic_violence_recency: DomesticViolenceRecency::ThreeToSixMonths,
        currently_fleeing: HmisResponse::No,
        dv_redaction_level: DvRedactionLevel::RedactForNonDvSpecialists,
        ..PsdePayload::default()
    }
}

pub(crate) fn income_correction(total: u32, reason: CorrectionReason) -> CorrectionRequest {
    CorrectionRequest {
        payload: PsdePayload {
            total_monthly_income: Some(total),
            ..payload()
        },
        reason,
        justification: "Verified against pay stubs".to_string(),
        idempotency_key: None,
    }
}

pub(crate) fn build_service() -> (PsdeService<MemoryPsdeRepository>, Arc<MemoryPsdeRepository>) {
    let repository = Arc::new(MemoryPsdeRepository::default());
    let service = PsdeService::new(repository.clone(), AccessPolicy::default()).with_clock(now);
    (service, repository)
}

#[derive(Default, Clone)]
pub(crate) struct MemoryPsdeRepository {
    pub(crate) families: Arc<Mutex<HashMap<FamilyId, RecordFamily>>>,
}

impl PsdeRepository for MemoryPsdeRepository {
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

pub(crate) struct UnavailablePsdeRepository;

impl PsdeRepository for UnavailablePsdeRepository {
    fn insert(&self, _family: RecordFamily) -> Result<RecordFamily, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _family: RecordFamily, _expected_revision: u64) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &FamilyId) -> Result<Option<RecordFamily>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn find_by_record(&self, _id: &RecordId) -> Result<Option<RecordFamily>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}
