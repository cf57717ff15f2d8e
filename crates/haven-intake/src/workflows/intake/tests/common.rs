use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::workflows::codes::{
    DomesticViolenceRecency, DvRedactionLevel, HmisResponse, IncomeSource, LengthOfStay,
    LethalityLevel, PriorLivingSituation, ProgramType,
};
use crate::workflows::intake::domain::{
    ConsentPayload, ContactMethod, HealthAndDvPayload, HouseholdPayload, HousingHistoryPayload,
    IdentityPayload, IncomeEntry, IncomePayload, InitialContactPayload, IntakeId, IntakeStage,
    ProgramSelectionPayload, SafetyScreeningPayload, StagePayload,
};
use crate::workflows::intake::repository::WorkflowRepository;
use crate::workflows::intake::service::IntakeService;
use crate::workflows::intake::workflow::{WorkflowOrchestrator, WorkflowRecord};
use crate::workflows::repository::RepositoryError;

pub(crate) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(crate) fn today() -> NaiveDate {
    date(2025, 3, 10)
}

pub(crate) fn contact() -> StagePayload {
    StagePayload::InitialContact(InitialContactPayload {
        client_alias: Some("Robin".to_string()),
        contact_date: Some(date(2025, 3, 1)),
        referral_source: Some("Hotline".to_string()),
        safe_contact_method: Some(ContactMethod::InPerson),
        safe_phone: None,
        okay_to_leave_message: None,
    })
}

/// Moderate lethality with a shelter gap: raised to HIGH and routed to safety planning.
pub(crate) fn safety() -> StagePayload {
    StagePayload::SafetyScreening(SafetyScreeningPayload {
        screening_date: Some(date(2025, 3, 1)),
        lethality_level: LethalityLevel::Moderate,
        currently_safe: Some(true),
        has_safe_place: Some(false),
        needs_shelter: Some(true),
        safety_plan_started: true,
    })
}

pub(crate) fn consent_payload() -> ConsentPayload {
    ConsentPayload {
        consent_to_services: Some(true),
        consent_to_data_sharing: Some(true),
        hmis_participation: Some(true),
        consent_date: Some(date(2025, 3, 1)),
        vawa_confidentiality_requested: true,
        dv_redaction_level: DvRedactionLevel::VictimRequestedConfidentiality,
    }
}

pub(crate) fn consent() -> StagePayload {
    StagePayload::Consent(consent_payload())
}

pub(crate) fn identity() -> StagePayload {
    StagePayload::Identity(IdentityPayload {
        first_name: Some("Robin".to_string()),
        last_name: Some("Hale".to_string()),
        anonymous: false,
        date_of_birth: Some(date(1990, 5, 4)),
        ssn: None,
        gender: Some("woman".to_string()),
        race_ethnicity: vec!["white".to_string()],
        veteran_status: HmisResponse::No,
    })
}

pub(crate) fn housing() -> StagePayload {
    StagePayload::HousingHistory(HousingHistoryPayload {
        prior_living_situation: PriorLivingSituation::EmergencyShelter,
        length_of_stay: LengthOfStay::OneToThreeMonths,
        project_entry_date: Some(date(2025, 3, 2)),
        homelessness_start_date: Some(date(2024, 1, 15)),
        times_homeless_past_three_years: Some(2),
        months_homeless_past_three_years: Some(14),
        fleeing_domestic_violence: true,
        losing_housing_within_fourteen_days: false,
        homeless_under_other_statute: false,
    })
}

pub(crate) fn household() -> StagePayload {
    StagePayload::Household(HouseholdPayload::new(1, 2))
}

pub(crate) fn income() -> StagePayload {
    StagePayload::Income(IncomePayload {
        information_date: Some(date(2025, 3, 2)),
        income_from_any_source: HmisResponse::Yes,
        total_monthly_income: Some(900),
        sources: vec![IncomeEntry {
            source: IncomeSource::Earned,
            monthly_amount: 900,
        }],
        non_cash_benefits: Vec::new(),
        covered_by_health_insurance: HmisResponse::Yes,
    })
}

pub(crate) fn health() -> StagePayload {
    StagePayload::HealthAndDomesticViolence(HealthAndDvPayload {
        information_date: Some(date(2025, 3, 2)),
        disabling_condition: HmisResponse::Yes,
        physical_disability: HmisResponse::No,
        developmental_disability: HmisResponse::No,
        chronic_health_condition: HmisResponse::No,
        hiv_aids: HmisResponse::No,
        mental_health_disorder: HmisResponse::Yes,
        substance_use_disorder: HmisResponse::No,
        domestic_violence: HmisResponse::Yes,
        domestic_violence_recency: DomesticViolenceRecency::WithinThreeMonths,
        currently_fleeing: HmisResponse::Yes,
    })
}

pub(crate) fn selection(program: ProgramType) -> StagePayload {
    StagePayload::ProgramSelection(ProgramSelectionPayload {
        selected_program: Some(program),
        override_justification: None,
    })
}

/// Valid payloads for the nine required stages, in order.
pub(crate) fn required_payloads() -> Vec<StagePayload> {
    vec![
        contact(),
        safety(),
        consent(),
        identity(),
        housing(),
        household(),
        income(),
        health(),
        selection(ProgramType::PermanentSupportiveHousing),
    ]
}

/// Saves and completes each payload in order, starting from a fresh record.
pub(crate) fn completed_record(
    orchestrator: &WorkflowOrchestrator,
    payloads: Vec<StagePayload>,
) -> WorkflowRecord {
    let mut record = orchestrator.start(IntakeId("intake-test".to_string()), today());
    for payload in payloads {
        let stage = payload.stage();
        record = orchestrator
            .save_stage(&record, stage, payload, today())
            .unwrap_or_else(|error| panic!("save {stage}: {error}"))
            .record;
        record = orchestrator
            .complete_stage(&record, stage, today())
            .unwrap_or_else(|error| panic!("complete {stage}: {error}"))
            .record;
    }
    record
}

pub(crate) fn completed_through(
    orchestrator: &WorkflowOrchestrator,
    last: IntakeStage,
) -> WorkflowRecord {
    let payloads = required_payloads()
        .into_iter()
        .filter(|payload| payload.stage() <= last)
        .collect();
    completed_record(orchestrator, payloads)
}

pub(crate) fn build_service() -> (IntakeService<MemoryRepository>, Arc<MemoryRepository>) {
    let repository = Arc::new(MemoryRepository::default());
    let service =
        IntakeService::new(repository.clone(), WorkflowOrchestrator::default()).with_today(today);
    (service, repository)
}

#[derive(Default, Clone)]
pub(crate) struct MemoryRepository {
    pub(crate) records: Arc<Mutex<HashMap<IntakeId, WorkflowRecord>>>,
}

impl WorkflowRepository for MemoryRepository {
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

pub(crate) struct UnavailableRepository;

impl WorkflowRepository for UnavailableRepository {
    fn insert(&self, _record: WorkflowRecord) -> Result<WorkflowRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(
        &self,
        _record: WorkflowRecord,
        _expected_revision: u64,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &IntakeId) -> Result<Option<WorkflowRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn open_intakes(&self, _limit: usize) -> Result<Vec<WorkflowRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(crate) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 256 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
