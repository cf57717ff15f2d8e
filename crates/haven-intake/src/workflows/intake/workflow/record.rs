use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::workflows::intake::domain::{
    ConsentPayload, IntakeId, IntakeStage, StagePayload, StageStatus,
};
use crate::workflows::intake::eligibility::{EligibilityResult, RiskAssessment};

/// Which stages gate submission and which may be collected before consent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    pub optional_stages: BTreeSet<IntakeStage>,
    pub before_consent_stages: BTreeSet<IntakeStage>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            optional_stages: BTreeSet::from([IntakeStage::ServicePlan]),
            before_consent_stages: BTreeSet::from([
                IntakeStage::InitialContact,
                IntakeStage::SafetyScreening,
                IntakeStage::Consent,
            ]),
        }
    }
}

impl WorkflowConfig {
    pub fn with_optional_stages(mut self, stages: impl IntoIterator<Item = IntakeStage>) -> Self {
        self.optional_stages = stages.into_iter().collect();
        self
    }

    pub fn is_required(&self, stage: IntakeStage) -> bool {
        !self.optional_stages.contains(&stage)
    }

    pub fn allowed_before_consent(&self, stage: IntakeStage) -> bool {
        self.before_consent_stages.contains(&stage)
    }

    pub fn required_stages(&self) -> impl Iterator<Item = IntakeStage> + '_ {
        IntakeStage::ordered()
            .into_iter()
            .filter(move |stage| self.is_required(*stage))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageState {
    pub stage: IntakeStage,
    pub status: StageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<StagePayload>,
    /// Held back while an earlier stage is reopened; restored once the stage unlocks again.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parked: Option<StagePayload>,
}

/// One client intake attempt. Passed into and returned from every orchestrator operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRecord {
    pub intake_id: IntakeId,
    pub created_on: NaiveDate,
    pub updated_on: NaiveDate,
    /// Incremented on every change; persistence compares it for optimistic concurrency.
    #[serde(default)]
    pub revision: u64,
    pub stages: Vec<StageState>,
    #[serde(default)]
    pub risk: Option<RiskAssessment>,
    #[serde(default)]
    pub eligibility: Option<EligibilityResult>,
    #[serde(default)]
    pub submitted_on: Option<NaiveDate>,
}

impl WorkflowRecord {
    pub fn new(intake_id: IntakeId, created_on: NaiveDate) -> Self {
        let stages = IntakeStage::ordered()
            .into_iter()
            .map(|stage| StageState {
                stage,
                status: StageStatus::NotStarted,
                payload: None,
                parked: None,
            })
            .collect();

        Self {
            intake_id,
            created_on,
            updated_on: created_on,
            revision: 0,
            stages,
            risk: None,
            eligibility: None,
            submitted_on: None,
        }
    }

    pub(crate) fn touch(&mut self, today: NaiveDate) {
        self.updated_on = today;
        self.revision += 1;
    }

    pub fn state(&self, stage: IntakeStage) -> Option<&StageState> {
        self.stages.iter().find(|state| state.stage == stage)
    }

    pub(crate) fn state_mut(&mut self, stage: IntakeStage) -> Option<&mut StageState> {
        self.stages.iter_mut().find(|state| state.stage == stage)
    }

    pub fn status(&self, stage: IntakeStage) -> StageStatus {
        self.state(stage)
            .map(|state| state.status)
            .unwrap_or_default()
    }

    pub fn is_complete(&self, stage: IntakeStage) -> bool {
        self.status(stage) == StageStatus::Complete
    }

    pub fn payload(&self, stage: IntakeStage) -> Option<&StagePayload> {
        self.state(stage).and_then(|state| state.payload.as_ref())
    }

    pub fn consent(&self) -> Option<&ConsentPayload> {
        match self.payload(IntakeStage::Consent) {
            Some(StagePayload::Consent(consent)) => Some(consent),
            _ => None,
        }
    }

    pub fn has_consent_to_services(&self) -> bool {
        self.consent()
            .and_then(|consent| consent.consent_to_services)
            .unwrap_or(false)
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted_on.is_some()
    }
}
