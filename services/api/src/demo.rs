use crate::infra::{InMemoryPsdeRepository, InMemoryWorkflowRepository};
use chrono::{Duration, NaiveDate, Utc};
use clap::Args;
use haven_intake::config::EngineConfig;
use haven_intake::error::AppError;
use haven_intake::workflows::codes::{
    DomesticViolenceRecency, DvRedactionLevel, HmisResponse, IncomeSource, LengthOfStay,
    LethalityLevel, PriorLivingSituation, ProgramType,
};
use haven_intake::workflows::intake::domain::{
    ConsentPayload, ContactMethod, HealthAndDvPayload, HouseholdPayload, HousingHistoryPayload,
    IdentityPayload, IncomeEntry, IncomePayload, InitialContactPayload, ProgramSelectionPayload,
    SafetyScreeningPayload,
};
use haven_intake::workflows::intake::{
    EligibilityEngine, EligibilityInput, IntakeService, StagePayload, WorkflowOrchestrator,
};
use haven_intake::workflows::psde::{
    AccessPolicy, CorrectionReason, CorrectionRequest, PsdePayload, PsdeService, ViewerContext,
};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Skip the program-specific record portion of the demo.
    #[arg(long)]
    pub(crate) skip_records: bool,
    /// Print the redacted record views as JSON.
    #[arg(long)]
    pub(crate) show_json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct EligibilityArgs {
    /// JSON eligibility input; reads stdin when omitted or set to '-'.
    #[arg(long)]
    pub(crate) input: Option<PathBuf>,
}

pub(crate) fn run_eligibility(args: EligibilityArgs) -> Result<(), AppError> {
    let raw = match args.input {
        Some(path) if path.as_os_str() != "-" => std::fs::read_to_string(path)?,
        _ => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };
    let input: EligibilityInput = serde_json::from_str(&raw).map_err(std::io::Error::from)?;
    let engine = EligibilityEngine::new(EngineConfig::from_env()?.eligibility);
    let result = engine.determine(&input);

    let rendered = serde_json::to_string_pretty(&result).map_err(std::io::Error::from)?;
    println!("{rendered}");
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let engine = EngineConfig::from_env()?;
    let today = Utc::now().date_naive();
    let orchestrator =
        WorkflowOrchestrator::new(engine.workflow, EligibilityEngine::new(engine.eligibility));
    let intake = IntakeService::new(Arc::new(InMemoryWorkflowRepository::default()), orchestrator);

    println!("Client intake demo");
    let record = intake.start()?;
    let intake_id = record.intake_id.clone();
    println!("Intake {} opened {}", intake_id, record.created_on);

    for payload in sample_payloads(today) {
        let stage = payload.stage();
        let saved = intake.save_stage(&intake_id, stage.number(), payload)?;
        for finding in saved.report.warnings.iter() {
            println!("  warning [{}] {}", finding.field, finding.message);
        }
        intake.complete_stage(&intake_id, stage.number())?;

        let progress = intake.progress(&intake_id)?;
        println!(
            "  {:>2}. {:<32} {:>3}% required complete | next: {}",
            stage.number(),
            stage.label(),
            progress.required_percent,
            progress.next_action
        );
    }

    let progress = intake.progress(&intake_id)?;
    println!(
        "\nRisk level: {}{}",
        progress.risk_level.label(),
        if progress.safety_routing_recommended {
            " (safety planning recommended)"
        } else {
            ""
        }
    );

    if let Some(result) = intake.eligibility(&intake_id)? {
        println!(
            "Homeless category: {} | chronic: {}",
            result.homeless_category.label(),
            if result.chronically_homeless { "yes" } else { "no" }
        );
        let programs: Vec<&str> = result
            .eligible_programs()
            .into_iter()
            .map(ProgramType::label)
            .collect();
        println!("Eligible programs: {}", programs.join(", "));
        println!("Recommendation: {}", result.recommendation_reason);
        for reason in result.reason_summaries() {
            println!("- {reason}");
        }
    }

    let readiness = intake.readiness(&intake_id)?;
    match readiness.reason() {
        Some(reason) => println!("Submission blocked: {reason}"),
        None => {
            let submitted = intake.submit(&intake_id)?;
            if let Some(submitted_on) = submitted.submitted_on {
                println!("Submitted on {submitted_on}");
            }
        }
    }

    if args.skip_records {
        return Ok(());
    }

    println!("\nProgram-specific record demo (DV details redacted by role)");
    let caseworker = ViewerContext::new("amy", ["CASE_MANAGER"]);
    let specialist = ViewerContext::new("dana", ["DV_SPECIALIST"]);
    let supervisor = ViewerContext::new("sam", ["SUPERVISOR", "DATA_MANAGER"]);
    let records = PsdeService::new(
        Arc::new(InMemoryPsdeRepository::default()),
        AccessPolicy::new(engine.access),
    );

    let record = intake.get(&intake_id)?;
    let Some(payload) = PsdePayload::from_intake(&record, &specialist.user_id) else {
        println!("  Health and DV stage missing; no record created");
        return Ok(());
    };
    let created = records.create(payload.clone(), &specialist)?;
    let family_id = created.family.family_id();
    println!(
        "  Family {} version {} ({})",
        family_id,
        created.record.version,
        created.record.lifecycle_status.label()
    );

    let corrected = records.correct(
        &family_id,
        created.record.version,
        CorrectionRequest {
            payload: PsdePayload {
                total_monthly_income: payload.total_monthly_income.map(|total| total + 150),
                ..payload.clone()
            },
            reason: CorrectionReason::ClientCorrection,
            justification: "Client reported a second part-time job".to_string(),
            idempotency_key: None,
        },
        &specialist,
    )?;
    println!(
        "  Correction -> version {} ({})",
        corrected.record.version,
        corrected.record.lifecycle_status.label()
    );

    let pending = records.correct(
        &family_id,
        corrected.record.version,
        CorrectionRequest {
            payload: PsdePayload {
                covered_by_health_insurance: HmisResponse::No,
                ..corrected.record.payload.clone()
            },
            reason: CorrectionReason::AuditFinding,
            justification: "Insurance lapsed before entry per audit".to_string(),
            idempotency_key: None,
        },
        &specialist,
    )?;
    println!(
        "  Audit finding -> version {} ({})",
        pending.record.version,
        pending.record.lifecycle_status.label()
    );
    let approved = records.approve(&family_id, pending.record.version, &supervisor)?;
    println!(
        "  Approved by {} -> {}",
        supervisor.user_id,
        approved.record.lifecycle_status.label()
    );

    let summary = records.audit_trail(&family_id, &specialist)?.summary();
    println!(
        "  Audit: {} versions, {} corrections, users: {}",
        summary.total_versions,
        summary.total_corrections,
        summary
            .involved_users
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    );
    let score = records.compliance(&family_id, &specialist)?;
    println!(
        "  Compliance {}/100 (data quality {}, VAWA {}, completeness {}, lifecycle {})",
        score.total, score.data_quality, score.vawa_compliance, score.completeness, score.lifecycle
    );

    for viewer in [&caseworker, &specialist] {
        let view = records.view(&family_id, viewer)?;
        let recency = view["payload"]["domestic_violence_recency"].clone();
        println!("  {} sees recency: {}", viewer.user_id, recency);
        if args.show_json {
            let rendered = serde_json::to_string_pretty(&view).map_err(std::io::Error::from)?;
            println!("{rendered}");
        }
    }

    Ok(())
}

fn sample_payloads(today: NaiveDate) -> Vec<StagePayload> {
    let contact_date = today - Duration::days(7);
    let entry_date = today - Duration::days(6);

    vec![
        StagePayload::InitialContact(InitialContactPayload {
            client_alias: Some("Robin".to_string()),
            contact_date: Some(contact_date),
            referral_source: Some("Hotline".to_string()),
            safe_contact_method: Some(ContactMethod::InPerson),
            ..Default::default()
        }),
        StagePayload::SafetyScreening(SafetyScreeningPayload {
            screening_date: Some(contact_date),
            lethality_level: LethalityLevel::Moderate,
            currently_safe: Some(true),
            has_safe_place: Some(false),
            needs_shelter: Some(true),
            safety_plan_started: true,
        }),
        StagePayload::Consent(ConsentPayload {
            consent_to_services: Some(true),
            consent_to_data_sharing: Some(true),
            hmis_participation: Some(true),
            consent_date: Some(contact_date),
            vawa_confidentiality_requested: false,
            dv_redaction_level: DvRedactionLevel::RedactForNonDvSpecialists,
        }),
        StagePayload::Identity(IdentityPayload {
            first_name: Some("Robin".to_string()),
            last_name: Some("Hale".to_string()),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 5, 4),
            gender: Some("woman".to_string()),
            race_ethnicity: vec!["white".to_string()],
            veteran_status: HmisResponse::No,
            ..Default::default()
        }),
        StagePayload::HousingHistory(HousingHistoryPayload {
            prior_living_situation: PriorLivingSituation::EmergencyShelter,
            length_of_stay: LengthOfStay::OneToThreeMonths,
            project_entry_date: Some(entry_date),
            homelessness_start_date: Some(today - Duration::days(420)),
            times_homeless_past_three_years: Some(2),
            months_homeless_past_three_years: Some(14),
            fleeing_domestic_violence: true,
            ..Default::default()
        }),
        StagePayload::Household(HouseholdPayload::new(1, 2)),
        StagePayload::Income(IncomePayload {
            information_date: Some(entry_date),
            income_from_any_source: HmisResponse::Yes,
            total_monthly_income: Some(900),
            sources: vec![IncomeEntry {
                source: IncomeSource::Earned,
                monthly_amount: 900,
            }],
            non_cash_benefits: Vec::new(),
            covered_by_health_insurance: HmisResponse::Yes,
        }),
        StagePayload::HealthAndDomesticViolence(HealthAndDvPayload {
            information_date: Some(entry_date),
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
        }),
        StagePayload::ProgramSelection(ProgramSelectionPayload {
            selected_program: Some(ProgramType::PermanentSupportiveHousing),
            override_justification: None,
        }),
    ]
}
