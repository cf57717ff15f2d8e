//! Per-stage validation.
//!
//! Each stage validator is a list of small rules evaluated over the whole
//! payload. Rules never short-circuit, so callers always receive every finding
//! for a payload at once. Only `Severity::Error` findings affect validity.

mod rules;
mod stages;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::{IntakeStage, StagePayload};
use super::eligibility::EligibilityResult;
use super::workflow::WorkflowRecord;
use crate::workflows::codes::DvRedactionLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Error,
    Warning,
}

/// Single problem found in a stage payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationFinding {
    pub field: String,
    pub message: String,
    pub severity: Severity,
}

impl ValidationFinding {
    pub fn error(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            severity: Severity::Error,
        }
    }

    pub fn warning(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            severity: Severity::Warning,
        }
    }

    pub fn is_blocking(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Findings partitioned by severity.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    pub errors: Vec<ValidationFinding>,
    pub warnings: Vec<ValidationFinding>,
    pub is_valid: bool,
}

impl ValidationReport {
    pub fn from_findings(findings: Vec<ValidationFinding>) -> Self {
        let (errors, warnings): (Vec<_>, Vec<_>) =
            findings.into_iter().partition(ValidationFinding::is_blocking);
        let is_valid = errors.is_empty();
        Self {
            errors,
            warnings,
            is_valid,
        }
    }

    pub fn errors_for(&self, field: &str) -> Vec<&ValidationFinding> {
        self.errors
            .iter()
            .filter(|finding| finding.field == field)
            .collect()
    }

    pub fn warnings_for(&self, field: &str) -> Vec<&ValidationFinding> {
        self.warnings
            .iter()
            .filter(|finding| finding.field == field)
            .collect()
    }

    pub fn has_error_on(&self, field: &str) -> bool {
        self.errors.iter().any(|finding| finding.field == field)
    }

    pub fn has_warning_on(&self, field: &str) -> bool {
        self.warnings.iter().any(|finding| finding.field == field)
    }
}

/// Facts from earlier stages that cross-stage rules compare against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationContext {
    pub today: NaiveDate,
    pub contact_date: Option<NaiveDate>,
    pub consent_date: Option<NaiveDate>,
    pub project_entry_date: Option<NaiveDate>,
    pub dv_redaction_level: Option<DvRedactionLevel>,
    pub eligibility: Option<EligibilityResult>,
}

impl ValidationContext {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today,
            contact_date: None,
            consent_date: None,
            project_entry_date: None,
            dv_redaction_level: None,
            eligibility: None,
        }
    }

    pub fn from_record(record: &WorkflowRecord, today: NaiveDate) -> Self {
        let mut context = Self::new(today);

        if let Some(StagePayload::InitialContact(contact)) =
            record.payload(IntakeStage::InitialContact)
        {
            context.contact_date = contact.contact_date;
        }
        if let Some(StagePayload::Consent(consent)) = record.payload(IntakeStage::Consent) {
            context.consent_date = consent.consent_date;
            context.dv_redaction_level = Some(consent.dv_redaction_level);
        }
        if let Some(StagePayload::HousingHistory(housing)) =
            record.payload(IntakeStage::HousingHistory)
        {
            context.project_entry_date = housing.project_entry_date;
        }
        context.eligibility = record.eligibility.clone();

        context
    }
}

/// Validates `payload` as the data for `stage`.
pub fn validate_stage(
    stage: IntakeStage,
    payload: &StagePayload,
    context: &ValidationContext,
) -> ValidationReport {
    if payload.stage() != stage {
        return ValidationReport::from_findings(vec![ValidationFinding::error(
            "stage",
            format!(
                "payload for {} cannot be submitted as {}",
                payload.stage(),
                stage
            ),
        )]);
    }

    let findings = match payload {
        StagePayload::InitialContact(data) => stages::initial_contact(data, context),
        StagePayload::SafetyScreening(data) => stages::safety_screening(data, context),
        StagePayload::Consent(data) => stages::consent(data, context),
        StagePayload::Identity(data) => stages::identity(data, context),
        StagePayload::HousingHistory(data) => stages::housing_history(data, context),
        StagePayload::Household(data) => stages::household(data, context),
        StagePayload::Income(data) => stages::income(data, context),
        StagePayload::HealthAndDomesticViolence(data) => stages::health_and_dv(data, context),
        StagePayload::ProgramSelection(data) => stages::program_selection(data, context),
        StagePayload::ServicePlan(data) => stages::service_plan(data, context),
    };

    ValidationReport::from_findings(findings)
}

/// Same as [`validate_stage`] but addressed by the one-based stage number.
pub fn validate_stage_number(
    stage_number: u8,
    payload: &StagePayload,
    context: &ValidationContext,
) -> ValidationReport {
    match IntakeStage::from_number(stage_number) {
        Some(stage) => validate_stage(stage, payload, context),
        None => ValidationReport::from_findings(vec![ValidationFinding::error(
            "stage",
            format!("stage {stage_number} does not exist; stages are numbered 1 to 10"),
        )]),
    }
}
