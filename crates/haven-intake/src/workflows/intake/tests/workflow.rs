use super::common::*;
use crate::workflows::codes::{HmisResponse, ProgramType, RiskLevel};
use crate::workflows::intake::domain::{
    HealthAndDvPayload, HouseholdPayload, IntakeId, IntakeStage, ServicePlanPayload,
    StagePayload, StageStatus,
};
use crate::workflows::intake::workflow::{
    SubmissionReadiness, WorkflowConfig, WorkflowError, WorkflowOrchestrator, WorkflowProgress,
    WorkflowRecord,
};

#[test]
fn identity_is_locked_until_consent_is_complete() {
    let orchestrator = WorkflowOrchestrator::default();
    let record = completed_through(&orchestrator, IntakeStage::SafetyScreening);

    match orchestrator.save_stage(&record, IntakeStage::Identity, identity(), today()) {
        Err(WorkflowError::StageLocked { stage, missing }) => {
            assert_eq!(stage, IntakeStage::Identity);
            assert_eq!(missing, vec![IntakeStage::Consent]);
        }
        other => panic!("expected locked stage, got {other:?}"),
    }
}

#[test]
fn pre_consent_stages_can_be_saved_in_any_order() {
    let orchestrator = WorkflowOrchestrator::default();
    let record = orchestrator.start(IntakeId("intake-order".into()), today());

    let outcome = orchestrator
        .save_stage(&record, IntakeStage::Consent, consent(), today())
        .expect("consent is collectable before other stages");
    assert_eq!(outcome.record.status(IntakeStage::Consent), StageStatus::InProgress);
    assert_eq!(outcome.record.revision, 1);
}

#[test]
fn blocking_findings_prevent_completion_and_leave_record_untouched() {
    let orchestrator = WorkflowOrchestrator::default();
    let record = completed_through(&orchestrator, IntakeStage::Income);

    let bad = HealthAndDvPayload {
        domestic_violence: HmisResponse::Yes,
        ..Default::default()
    };

    let saved = orchestrator
        .save_stage(
            &record,
            IntakeStage::HealthAndDomesticViolence,
            StagePayload::HealthAndDomesticViolence(bad),
            today(),
        )
        .expect("drafts may be invalid");
    assert!(!saved.report.is_valid);

    let completed = orchestrator.complete_stage(
        &saved.record,
        IntakeStage::HealthAndDomesticViolence,
        today(),
    );
    match completed {
        Err(WorkflowError::BlockingFindings { errors, .. }) => {
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].field, "domesticViolenceRecency");
        }
        other => panic!("expected blocking findings, got {other:?}"),
    }
    assert_eq!(
        saved.record.status(IntakeStage::HealthAndDomesticViolence),
        StageStatus::InProgress
    );
}

#[test]
fn safety_save_attaches_risk_and_recommends_routing() {
    let orchestrator = WorkflowOrchestrator::default();
    let record = completed_through(&orchestrator, IntakeStage::SafetyScreening);

    let risk = record.risk.as_ref().expect("risk assessed");
    assert_eq!(risk.risk_level, RiskLevel::High);
    assert!(risk.auto_route_to_safety);

    let progress = orchestrator.progress(&record);
    assert!(progress.safety_routing_recommended);
    assert!(progress.next_action.starts_with("Route to safety planning"));
}

#[test]
fn program_selection_stores_eligibility() {
    let orchestrator = WorkflowOrchestrator::default();
    let record = completed_through(&orchestrator, IntakeStage::ProgramSelection);

    let eligibility = record.eligibility.as_ref().expect("eligibility computed");
    assert!(eligibility.chronically_homeless);
    assert_eq!(
        eligibility.recommended_program,
        Some(ProgramType::PermanentSupportiveHousing)
    );
}

#[test]
fn progress_reports_two_completeness_metrics() {
    let orchestrator = WorkflowOrchestrator::default();
    let record = completed_record(&orchestrator, required_payloads());

    let progress = orchestrator.progress(&record);
    assert_eq!(progress.required_completed, 9);
    assert_eq!(progress.required_total, 9);
    assert_eq!(progress.required_percent, 100);
    assert_eq!(progress.completed_stages, 9);
    assert_eq!(progress.progress_percent, 90);
    assert_eq!(progress.next_step, Some(IntakeStage::ServicePlan));
    assert!(orchestrator.can_submit_intake(&record).is_ready());
}

#[test]
fn optional_stages_follow_configuration() {
    let config = WorkflowConfig::default().with_optional_stages(Vec::new());
    let orchestrator = WorkflowOrchestrator::new(config, Default::default());
    let record = completed_record(&orchestrator, required_payloads());

    match orchestrator.can_submit_intake(&record) {
        SubmissionReadiness::MissingSteps { steps, .. } => {
            assert_eq!(steps, vec![IntakeStage::ServicePlan]);
        }
        other => panic!("expected missing service plan, got {other:?}"),
    }
}

#[test]
fn missing_consent_is_reported_before_missing_steps() {
    let orchestrator = WorkflowOrchestrator::default();
    let mut record = completed_record(&orchestrator, required_payloads());
    if let Some(state) = record
        .stages
        .iter_mut()
        .find(|state| state.stage == IntakeStage::Consent)
    {
        let mut payload = consent_payload();
        payload.consent_to_services = None;
        state.payload = Some(StagePayload::Consent(payload));
    }

    let readiness = orchestrator.can_submit_intake(&record);
    assert!(matches!(readiness, SubmissionReadiness::ConsentRequired { .. }));
    assert_eq!(readiness.reason(), Some("Client has not consented to services"));
    assert_eq!(
        orchestrator.submit(&record, today()),
        Err(WorkflowError::ConsentRequired)
    );
}

#[test]
fn missing_housing_history_is_reported_as_a_missing_step() {
    let orchestrator = WorkflowOrchestrator::default();
    let record = completed_through(&orchestrator, IntakeStage::Identity);

    let readiness = orchestrator.can_submit_intake(&record);
    match &readiness {
        SubmissionReadiness::MissingSteps { steps, reason } => {
            assert_eq!(steps.first(), Some(&IntakeStage::HousingHistory));
            assert!(reason.starts_with("Missing required steps"));
        }
        other => panic!("expected missing steps, got {other:?}"),
    }
    assert_ne!(readiness.reason(), Some("Client has not consented to services"));
}

#[test]
fn reopening_demotes_dependent_stages() {
    let orchestrator = WorkflowOrchestrator::default();
    let record = completed_through(&orchestrator, IntakeStage::Income);

    let reopened = orchestrator
        .reopen_stage(&record, IntakeStage::HousingHistory, today())
        .expect("reopen");
    assert_eq!(reopened.status(IntakeStage::Consent), StageStatus::Complete);
    assert_eq!(reopened.status(IntakeStage::HousingHistory), StageStatus::InProgress);
    assert_eq!(reopened.status(IntakeStage::Household), StageStatus::NotStarted);
    assert_eq!(reopened.status(IntakeStage::Income), StageStatus::NotStarted);

    assert!(matches!(
        orchestrator.save_stage(
            &reopened,
            IntakeStage::Household,
            StagePayload::Household(HouseholdPayload::new(2, 0)),
            today(),
        ),
        Err(WorkflowError::StageLocked { .. })
    ));
}

#[test]
fn reopened_consent_holds_back_later_payloads() {
    let orchestrator = WorkflowOrchestrator::default();
    let record = completed_through(&orchestrator, IntakeStage::Income);
    let config = orchestrator.config();

    let reopened = orchestrator
        .reopen_stage(&record, IntakeStage::Consent, today())
        .expect("reopen");
    for state in &reopened.stages {
        let gated_by_incomplete = IntakeStage::ordered()
            .into_iter()
            .take_while(|earlier| *earlier < state.stage)
            .any(|earlier| config.is_required(earlier) && !reopened.is_complete(earlier));
        if gated_by_incomplete && !config.allowed_before_consent(state.stage) {
            assert!(state.payload.is_none(), "{} kept its payload", state.stage);
        }
    }
    assert!(reopened.payload(IntakeStage::Identity).is_none());
    assert!(reopened.payload(IntakeStage::Income).is_none());
    assert!(reopened.payload(IntakeStage::Consent).is_some());

    let restored = orchestrator
        .complete_stage(&reopened, IntakeStage::Consent, today())
        .expect("consent completes again")
        .record;
    assert_eq!(restored.payload(IntakeStage::Identity), Some(&identity()));
    assert_eq!(restored.status(IntakeStage::Identity), StageStatus::InProgress);
    assert!(restored.payload(IntakeStage::HousingHistory).is_none());

    let restored = orchestrator
        .complete_stage(&restored, IntakeStage::Identity, today())
        .expect("identity completes again")
        .record;
    assert_eq!(restored.payload(IntakeStage::HousingHistory), Some(&housing()));
}

#[test]
fn completed_stage_must_be_reopened_before_editing() {
    let orchestrator = WorkflowOrchestrator::default();
    let record = completed_through(&orchestrator, IntakeStage::InitialContact);

    assert_eq!(
        orchestrator
            .save_stage(&record, IntakeStage::InitialContact, contact(), today())
            .map(|outcome| outcome.record),
        Err(WorkflowError::StageAlreadyComplete(IntakeStage::InitialContact))
    );
}

#[test]
fn submitted_intake_is_frozen() {
    let orchestrator = WorkflowOrchestrator::default();
    let record = completed_record(&orchestrator, required_payloads());
    let submitted = orchestrator.submit(&record, today()).expect("submittable");

    assert!(matches!(
        orchestrator.can_submit_intake(&submitted),
        SubmissionReadiness::AlreadySubmitted { .. }
    ));
    assert!(matches!(
        orchestrator.save_stage(
            &submitted,
            IntakeStage::ServicePlan,
            StagePayload::ServicePlan(ServicePlanPayload::default()),
            today(),
        ),
        Err(WorkflowError::AlreadySubmitted)
    ));
    assert!(orchestrator
        .progress(&submitted)
        .next_action
        .starts_with("Intake submitted"));
}

#[test]
fn mismatched_payload_is_rejected_without_storing() {
    let orchestrator = WorkflowOrchestrator::default();
    let record = orchestrator.start(IntakeId("intake-mismatch".into()), today());

    assert_eq!(
        orchestrator
            .save_stage(&record, IntakeStage::InitialContact, consent(), today())
            .map(|outcome| outcome.record),
        Err(WorkflowError::PayloadMismatch {
            expected: IntakeStage::InitialContact,
            found: IntakeStage::Consent,
        })
    );
}

#[test]
fn progress_survives_a_serde_round_trip() {
    let orchestrator = WorkflowOrchestrator::default();
    let record = completed_through(&orchestrator, IntakeStage::Household);
    let before = orchestrator.progress(&record);

    let json = serde_json::to_string(&record).expect("serialize");
    let restored: WorkflowRecord = serde_json::from_str(&json).expect("deserialize");
    let after: WorkflowProgress = orchestrator.progress(&restored);

    assert_eq!(restored, record);
    assert_eq!(after, before);
    assert_eq!(after.next_step, Some(IntakeStage::Income));
}
