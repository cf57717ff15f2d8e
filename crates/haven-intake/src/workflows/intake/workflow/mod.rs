//! Ten-stage intake state machine.
//!
//! Every operation takes a [`WorkflowRecord`] by reference and returns a new one, so a
//! failed operation leaves the caller's record untouched. Payloads for gated stages can
//! only be written once every required earlier stage is complete; stages marked as
//! collectable before consent are exempt.

mod progress;
mod record;

pub use progress::{StageProgress, SubmissionReadiness, WorkflowProgress};
pub use record::{StageState, WorkflowConfig, WorkflowRecord};

use chrono::NaiveDate;
use serde::Serialize;

use super::domain::{IntakeId, IntakeStage, StagePayload, StageStatus};
use super::eligibility::{EligibilityEngine, EligibilityInput, EligibilityResult, RiskAssessment};
use super::validation::{validate_stage, ValidationContext, ValidationFinding, ValidationReport};
use progress::stage_list;

/// Result of saving a stage draft: the updated record and the findings for the saved payload.
#[derive(Debug, Clone, Serialize)]
pub struct StageOutcome {
    pub record: WorkflowRecord,
    pub report: ValidationReport,
}

#[derive(Debug, Clone, Default)]
pub struct WorkflowOrchestrator {
    config: WorkflowConfig,
    eligibility: EligibilityEngine,
}

impl WorkflowOrchestrator {
    pub fn new(config: WorkflowConfig, eligibility: EligibilityEngine) -> Self {
        Self {
            config,
            eligibility,
        }
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    pub fn eligibility_engine(&self) -> &EligibilityEngine {
        &self.eligibility
    }

    pub fn start(&self, intake_id: IntakeId, today: NaiveDate) -> WorkflowRecord {
        WorkflowRecord::new(intake_id, today)
    }

    /// Required earlier stages that are not yet complete, plus consent when the
    /// stage may not be collected before it.
    pub fn missing_prerequisites(
        &self,
        record: &WorkflowRecord,
        stage: IntakeStage,
    ) -> Vec<IntakeStage> {
        if self.config.allowed_before_consent(stage) {
            return Vec::new();
        }

        let mut missing: Vec<IntakeStage> = IntakeStage::ordered()
            .into_iter()
            .take_while(|earlier| *earlier < stage)
            .filter(|earlier| self.config.is_required(*earlier) && !record.is_complete(*earlier))
            .collect();

        if !record.has_consent_to_services() && !missing.contains(&IntakeStage::Consent) {
            missing.push(IntakeStage::Consent);
            missing.sort();
        }
        missing
    }

    /// Stores a draft payload. Findings are returned, not enforced; drafts may be invalid.
    pub fn save_stage(
        &self,
        record: &WorkflowRecord,
        stage: IntakeStage,
        payload: StagePayload,
        today: NaiveDate,
    ) -> Result<StageOutcome, WorkflowError> {
        self.ensure_writable(record, stage)?;
        if payload.stage() != stage {
            return Err(WorkflowError::PayloadMismatch {
                expected: stage,
                found: payload.stage(),
            });
        }

        let mut next = record.clone();
        next.touch(today);
        self.refresh_derived(&mut next, stage, &payload);

        let context = ValidationContext::from_record(&next, today);
        let report = validate_stage(stage, &payload, &context);

        let state = next
            .state_mut(stage)
            .ok_or(WorkflowError::UnknownStage(stage.number()))?;
        state.payload = Some(payload.normalized());
        state.status = StageStatus::InProgress;

        Ok(StageOutcome {
            record: next,
            report,
        })
    }

    /// Marks a stage complete; rejected while the stored payload has blocking findings.
    pub fn complete_stage(
        &self,
        record: &WorkflowRecord,
        stage: IntakeStage,
        today: NaiveDate,
    ) -> Result<StageOutcome, WorkflowError> {
        self.ensure_writable(record, stage)?;
        let payload = record
            .payload(stage)
            .cloned()
            .ok_or(WorkflowError::MissingPayload(stage))?;

        let mut next = record.clone();
        self.refresh_derived(&mut next, stage, &payload);

        let context = ValidationContext::from_record(&next, today);
        let report = validate_stage(stage, &payload, &context);
        if !report.is_valid {
            return Err(WorkflowError::BlockingFindings {
                stage,
                errors: report.errors,
            });
        }

        next.touch(today);
        let state = next
            .state_mut(stage)
            .ok_or(WorkflowError::UnknownStage(stage.number()))?;
        state.status = StageStatus::Complete;
        self.restore_parked(&mut next);

        Ok(StageOutcome {
            record: next,
            report,
        })
    }

    /// Reopens a completed stage. Later gated stages lose their payloads until the
    /// reopened stage is complete again; the payloads are parked on the record and
    /// come back as in-progress drafts so they are revalidated against the corrected data.
    pub fn reopen_stage(
        &self,
        record: &WorkflowRecord,
        stage: IntakeStage,
        today: NaiveDate,
    ) -> Result<WorkflowRecord, WorkflowError> {
        if record.is_submitted() {
            return Err(WorkflowError::AlreadySubmitted);
        }
        if !record.is_complete(stage) {
            return Err(WorkflowError::StageNotComplete(stage));
        }

        let mut next = record.clone();
        next.touch(today);
        for state in next.stages.iter_mut() {
            if state.stage == stage {
                state.status = StageStatus::InProgress;
            } else if state.stage > stage && !self.config.allowed_before_consent(state.stage) {
                if let Some(payload) = state.payload.take() {
                    state.parked = Some(payload);
                    state.status = StageStatus::NotStarted;
                }
            }
        }
        if next.payload(IntakeStage::ProgramSelection).is_none() {
            next.eligibility = None;
        }
        Ok(next)
    }

    pub fn progress(&self, record: &WorkflowRecord) -> WorkflowProgress {
        WorkflowProgress::compute(record, &self.config)
    }

    pub fn can_submit_intake(&self, record: &WorkflowRecord) -> SubmissionReadiness {
        SubmissionReadiness::evaluate(record, &self.config)
    }

    pub fn submit(
        &self,
        record: &WorkflowRecord,
        today: NaiveDate,
    ) -> Result<WorkflowRecord, WorkflowError> {
        match self.can_submit_intake(record) {
            SubmissionReadiness::Ready => {
                let mut next = record.clone();
                next.submitted_on = Some(today);
                next.touch(today);
                Ok(next)
            }
            SubmissionReadiness::ConsentRequired { .. } => Err(WorkflowError::ConsentRequired),
            SubmissionReadiness::MissingSteps { steps, .. } => {
                Err(WorkflowError::MissingSteps(steps))
            }
            SubmissionReadiness::AlreadySubmitted { .. } => Err(WorkflowError::AlreadySubmitted),
        }
    }

    /// Eligibility from the housing, household, income, and health stages.
    /// Returns `None` until housing history has been saved.
    pub fn evaluate_eligibility(&self, record: &WorkflowRecord) -> Option<EligibilityResult> {
        eligibility_input(record).map(|input| self.eligibility.determine(&input))
    }

    fn ensure_writable(
        &self,
        record: &WorkflowRecord,
        stage: IntakeStage,
    ) -> Result<(), WorkflowError> {
        if record.is_submitted() {
            return Err(WorkflowError::AlreadySubmitted);
        }
        if record.is_complete(stage) {
            return Err(WorkflowError::StageAlreadyComplete(stage));
        }
        let missing = self.missing_prerequisites(record, stage);
        if !missing.is_empty() {
            return Err(WorkflowError::StageLocked { stage, missing });
        }
        Ok(())
    }

    /// Moves parked payloads back, in stage order, once nothing gates them.
    fn restore_parked(&self, record: &mut WorkflowRecord) {
        for stage in IntakeStage::ordered() {
            let parked = record
                .state(stage)
                .is_some_and(|state| state.parked.is_some());
            if !parked || !self.missing_prerequisites(record, stage).is_empty() {
                continue;
            }
            let Some(state) = record.state_mut(stage) else {
                continue;
            };
            let Some(payload) = state.parked.take() else {
                continue;
            };
            state.payload = Some(payload.clone());
            state.status = StageStatus::InProgress;
            self.refresh_derived(record, stage, &payload);
        }
    }

    fn refresh_derived(
        &self,
        record: &mut WorkflowRecord,
        stage: IntakeStage,
        payload: &StagePayload,
    ) {
        match (stage, payload) {
            (IntakeStage::SafetyScreening, StagePayload::SafetyScreening(screening)) => {
                record.risk = Some(RiskAssessment::from_screening(screening));
            }
            (IntakeStage::ProgramSelection, _) => {
                record.eligibility = self.evaluate_eligibility(record);
            }
            _ => {}
        }
    }
}

pub(crate) fn eligibility_input(record: &WorkflowRecord) -> Option<EligibilityInput> {
    let Some(StagePayload::HousingHistory(housing)) = record.payload(IntakeStage::HousingHistory)
    else {
        return None;
    };

    let mut input = EligibilityInput {
        prior_living_situation: housing.prior_living_situation,
        fleeing_domestic_violence: housing.fleeing_domestic_violence,
        losing_housing_within_fourteen_days: housing.losing_housing_within_fourteen_days,
        homeless_under_other_statute: housing.homeless_under_other_statute,
        months_homeless_past_three_years: housing.months_homeless_past_three_years.unwrap_or(0),
        times_homeless_past_three_years: housing.times_homeless_past_three_years.unwrap_or(0),
        household_size: 1,
        ..EligibilityInput::default()
    };

    if let Some(StagePayload::Household(household)) = record.payload(IntakeStage::Household) {
        input.household_size = household.total_size.max(1);
    }
    if let Some(StagePayload::Income(income)) = record.payload(IntakeStage::Income) {
        input.monthly_income = income.total_monthly_income.unwrap_or(0);
    }
    if let Some(StagePayload::HealthAndDomesticViolence(health)) =
        record.payload(IntakeStage::HealthAndDomesticViolence)
    {
        input.disabling_condition = health.disabling_condition;
        input.fleeing_domestic_violence |= health.currently_fleeing.is_yes();
    }

    Some(input)
}

/// Error raised by orchestrator operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkflowError {
    #[error("{stage} is locked until these are complete: {}", stage_list(.missing))]
    StageLocked {
        stage: IntakeStage,
        missing: Vec<IntakeStage>,
    },
    #[error("{stage} has {} blocking finding(s)", .errors.len())]
    BlockingFindings {
        stage: IntakeStage,
        errors: Vec<ValidationFinding>,
    },
    #[error("payload for {found} cannot be saved as {expected}")]
    PayloadMismatch {
        expected: IntakeStage,
        found: IntakeStage,
    },
    #[error("{0} has no saved data")]
    MissingPayload(IntakeStage),
    #[error("{0} is complete; reopen it before editing")]
    StageAlreadyComplete(IntakeStage),
    #[error("{0} is not complete")]
    StageNotComplete(IntakeStage),
    #[error("stage {0} does not exist")]
    UnknownStage(u8),
    #[error("client has not consented to services")]
    ConsentRequired,
    #[error("missing required steps: {}", stage_list(.0))]
    MissingSteps(Vec<IntakeStage>),
    #[error("intake has already been submitted")]
    AlreadySubmitted,
}
