use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::record::{WorkflowConfig, WorkflowRecord};
use crate::workflows::codes::RiskLevel;
use crate::workflows::intake::domain::{IntakeId, IntakeStage, StageStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageProgress {
    pub stage: IntakeStage,
    pub number: u8,
    pub label: String,
    pub status: StageStatus,
    pub required: bool,
}

/// Derived view of a record; recomputed on demand and never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowProgress {
    pub intake_id: IntakeId,
    pub stages: Vec<StageProgress>,
    pub completed_stages: usize,
    pub total_stages: usize,
    /// Share of all stages complete, optional ones included.
    pub progress_percent: u8,
    pub required_completed: usize,
    pub required_total: usize,
    /// Share of required stages complete; 100 means submission is not blocked by missing steps.
    pub required_percent: u8,
    pub next_step: Option<IntakeStage>,
    pub next_action: String,
    pub risk_level: RiskLevel,
    pub safety_routing_recommended: bool,
    pub submitted: bool,
}

impl WorkflowProgress {
    pub fn compute(record: &WorkflowRecord, config: &WorkflowConfig) -> Self {
        let stages: Vec<StageProgress> = IntakeStage::ordered()
            .into_iter()
            .map(|stage| StageProgress {
                stage,
                number: stage.number(),
                label: stage.label().to_string(),
                status: record.status(stage),
                required: config.is_required(stage),
            })
            .collect();

        let completed_stages = stages
            .iter()
            .filter(|entry| entry.status == StageStatus::Complete)
            .count();
        let required_total = stages.iter().filter(|entry| entry.required).count();
        let required_completed = stages
            .iter()
            .filter(|entry| entry.required && entry.status == StageStatus::Complete)
            .count();

        let next_step = stages
            .iter()
            .find(|entry| entry.status != StageStatus::Complete)
            .map(|entry| entry.stage);

        let risk_level = record
            .risk
            .as_ref()
            .map(|risk| risk.risk_level)
            .unwrap_or_default();
        let safety_routing_recommended = record
            .risk
            .as_ref()
            .map(|risk| risk.auto_route_to_safety)
            .unwrap_or(false);

        let readiness = SubmissionReadiness::evaluate(record, config);
        let next_action = next_action(record, next_step, &readiness, safety_routing_recommended);

        Self {
            intake_id: record.intake_id.clone(),
            total_stages: stages.len(),
            stages,
            completed_stages,
            progress_percent: percent(completed_stages, IntakeStage::COUNT),
            required_completed,
            required_total,
            required_percent: percent(required_completed, required_total),
            next_step,
            next_action,
            risk_level,
            safety_routing_recommended,
            submitted: record.is_submitted(),
        }
    }
}

fn percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    u8::try_from(done * 100 / total).unwrap_or(100)
}

fn next_action(
    record: &WorkflowRecord,
    next_step: Option<IntakeStage>,
    readiness: &SubmissionReadiness,
    safety_routing: bool,
) -> String {
    if let Some(submitted_on) = record.submitted_on {
        return format!("Intake submitted on {submitted_on}");
    }

    let step = match (readiness, next_step) {
        (SubmissionReadiness::Ready, Some(stage)) => {
            format!("Submit the intake, or complete optional {stage}")
        }
        (SubmissionReadiness::Ready, None) => "Submit the intake".to_string(),
        (_, Some(stage)) => format!("Complete {stage}"),
        (blocked, None) => blocked
            .reason()
            .unwrap_or("Review the intake")
            .to_string(),
    };

    if safety_routing {
        format!("Route to safety planning, then: {step}")
    } else {
        step
    }
}

/// Whether a record may be submitted. Consent is checked before anything else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmissionReadiness {
    Ready,
    ConsentRequired { reason: String },
    MissingSteps { reason: String, steps: Vec<IntakeStage> },
    AlreadySubmitted { submitted_on: NaiveDate },
}

impl SubmissionReadiness {
    pub fn evaluate(record: &WorkflowRecord, config: &WorkflowConfig) -> Self {
        if let Some(submitted_on) = record.submitted_on {
            return Self::AlreadySubmitted { submitted_on };
        }

        if !record.has_consent_to_services() {
            return Self::ConsentRequired {
                reason: "Client has not consented to services".to_string(),
            };
        }

        let steps: Vec<IntakeStage> = config
            .required_stages()
            .filter(|stage| !record.is_complete(*stage))
            .collect();
        if steps.is_empty() {
            return Self::Ready;
        }

        Self::MissingSteps {
            reason: format!("Missing required steps: {}", stage_list(&steps)),
            steps,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Ready | Self::AlreadySubmitted { .. } => None,
            Self::ConsentRequired { reason } | Self::MissingSteps { reason, .. } => Some(reason),
        }
    }
}

pub(crate) fn stage_list(stages: &[IntakeStage]) -> String {
    stages
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
