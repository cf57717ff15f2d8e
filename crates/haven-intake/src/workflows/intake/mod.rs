//! Ten-stage client intake: stage payloads, validation, eligibility, and orchestration.

pub mod domain;
pub mod eligibility;
pub mod repository;
pub mod router;
pub mod service;
pub mod validation;
pub mod workflow;

#[cfg(test)]
pub(crate) mod tests;

pub use domain::{IntakeId, IntakeStage, StagePayload, StageStatus};
pub use eligibility::{
    determine_eligibility, EligibilityConfig, EligibilityEngine, EligibilityInput,
    EligibilityResult, IneligibilityReason, RiskAssessment,
};
pub use repository::WorkflowRepository;
pub use router::intake_router;
pub use service::{IntakeService, IntakeServiceError};
pub use validation::{
    validate_stage, validate_stage_number, Severity, ValidationContext, ValidationFinding,
    ValidationReport,
};
pub use workflow::{
    StageOutcome, SubmissionReadiness, WorkflowConfig, WorkflowError, WorkflowOrchestrator,
    WorkflowProgress, WorkflowRecord,
};
