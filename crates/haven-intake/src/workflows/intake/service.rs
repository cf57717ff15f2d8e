use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use super::domain::{IntakeId, IntakeStage, StagePayload};
use super::eligibility::EligibilityResult;
use super::repository::WorkflowRepository;
use super::workflow::{
    StageOutcome, SubmissionReadiness, WorkflowError, WorkflowOrchestrator, WorkflowProgress,
    WorkflowRecord,
};
use crate::telemetry::AUDIT_TARGET;
use crate::workflows::repository::RepositoryError;

/// Service composing the orchestrator with a persistence adapter.
pub struct IntakeService<R> {
    repository: Arc<R>,
    orchestrator: Arc<WorkflowOrchestrator>,
    today: fn() -> NaiveDate,
}

fn utc_today() -> NaiveDate {
    Utc::now().date_naive()
}

fn next_intake_id() -> IntakeId {
    IntakeId(format!("intake-{}", Uuid::new_v4()))
}

impl<R> IntakeService<R>
where
    R: WorkflowRepository + 'static,
{
    pub fn new(repository: Arc<R>, orchestrator: WorkflowOrchestrator) -> Self {
        Self {
            repository,
            orchestrator: Arc::new(orchestrator),
            today: utc_today,
        }
    }

    /// Pins the calendar date used for validation, for deterministic tests and replays.
    pub fn with_today(mut self, today: fn() -> NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn orchestrator(&self) -> &WorkflowOrchestrator {
        &self.orchestrator
    }

    pub fn start(&self) -> Result<WorkflowRecord, IntakeServiceError> {
        let record = self.orchestrator.start(next_intake_id(), (self.today)());
        let stored = self.repository.insert(record)?;
        info!(intake_id = %stored.intake_id, "intake started");
        Ok(stored)
    }

    pub fn get(&self, intake_id: &IntakeId) -> Result<WorkflowRecord, IntakeServiceError> {
        let record = self
            .repository
            .fetch(intake_id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(record)
    }

    pub fn open_intakes(&self, limit: usize) -> Result<Vec<WorkflowRecord>, IntakeServiceError> {
        Ok(self.repository.open_intakes(limit)?)
    }

    pub fn save_stage(
        &self,
        intake_id: &IntakeId,
        stage_number: u8,
        payload: StagePayload,
    ) -> Result<StageOutcome, IntakeServiceError> {
        let stage = stage_from_number(stage_number)?;
        let record = self.get(intake_id)?;

        let outcome = self
            .orchestrator
            .save_stage(&record, stage, payload, (self.today)())?;
        self.repository
            .update(outcome.record.clone(), record.revision)?;

        info!(
            intake_id = %intake_id,
            stage = stage.number(),
            errors = outcome.report.errors.len(),
            warnings = outcome.report.warnings.len(),
            "stage saved"
        );
        let routed = outcome
            .record
            .risk
            .as_ref()
            .filter(|risk| risk.auto_route_to_safety);
        if let (IntakeStage::SafetyScreening, Some(risk)) = (stage, routed) {
            warn!(
                intake_id = %intake_id,
                risk_level = risk.risk_level.label(),
                "safety planning recommended"
            );
        }
        Ok(outcome)
    }

    pub fn complete_stage(
        &self,
        intake_id: &IntakeId,
        stage_number: u8,
    ) -> Result<StageOutcome, IntakeServiceError> {
        let stage = stage_from_number(stage_number)?;
        let record = self.get(intake_id)?;

        let outcome = match self
            .orchestrator
            .complete_stage(&record, stage, (self.today)())
        {
            Ok(outcome) => outcome,
            Err(error) => {
                info!(
                    intake_id = %intake_id,
                    stage = stage.number(),
                    %error,
                    "stage completion rejected"
                );
                return Err(error.into());
            }
        };
        self.repository
            .update(outcome.record.clone(), record.revision)?;

        info!(intake_id = %intake_id, stage = stage.number(), "stage completed");
        Ok(outcome)
    }

    pub fn reopen_stage(
        &self,
        intake_id: &IntakeId,
        stage_number: u8,
    ) -> Result<WorkflowRecord, IntakeServiceError> {
        let stage = stage_from_number(stage_number)?;
        let record = self.get(intake_id)?;

        let reopened = self
            .orchestrator
            .reopen_stage(&record, stage, (self.today)())?;
        self.repository.update(reopened.clone(), record.revision)?;

        info!(intake_id = %intake_id, stage = stage.number(), "stage reopened");
        Ok(reopened)
    }

    pub fn progress(&self, intake_id: &IntakeId) -> Result<WorkflowProgress, IntakeServiceError> {
        let record = self.get(intake_id)?;
        Ok(self.orchestrator.progress(&record))
    }

    pub fn readiness(
        &self,
        intake_id: &IntakeId,
    ) -> Result<SubmissionReadiness, IntakeServiceError> {
        let record = self.get(intake_id)?;
        Ok(self.orchestrator.can_submit_intake(&record))
    }

    pub fn eligibility(
        &self,
        intake_id: &IntakeId,
    ) -> Result<Option<EligibilityResult>, IntakeServiceError> {
        let record = self.get(intake_id)?;
        Ok(self.orchestrator.evaluate_eligibility(&record))
    }

    pub fn submit(&self, intake_id: &IntakeId) -> Result<WorkflowRecord, IntakeServiceError> {
        let record = self.get(intake_id)?;
        let submitted = self.orchestrator.submit(&record, (self.today)())?;
        self.repository.update(submitted.clone(), record.revision)?;

        info!(
            target: AUDIT_TARGET,
            intake_id = %intake_id,
            recommended_program = submitted
                .eligibility
                .as_ref()
                .and_then(|result| result.recommended_program_id.as_deref())
                .unwrap_or("none"),
            "intake submitted"
        );
        Ok(submitted)
    }
}

fn stage_from_number(number: u8) -> Result<IntakeStage, IntakeServiceError> {
    IntakeStage::from_number(number)
        .ok_or(IntakeServiceError::Workflow(WorkflowError::UnknownStage(number)))
}

/// Error raised by the intake service.
#[derive(Debug, thiserror::Error)]
pub enum IntakeServiceError {
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
