use chrono::NaiveDate;

use super::domain::{MoveInType, PsdePayload};
use crate::workflows::codes::{DomesticViolenceRecency, DvRedactionLevel, HmisResponse};
use crate::workflows::intake::validation::{ValidationFinding, ValidationReport};

type PsdeRule = fn(&PsdePayload, NaiveDate) -> Option<ValidationFinding>;

const RULES: &[PsdeRule] = &[
    |data, _| {
        data.information_date
            .is_none()
            .then(|| ValidationFinding::error("informationDate", "Information date is required"))
    },
    |data, today| {
        data.information_date.filter(|date| *date > today).map(|_| {
            ValidationFinding::error("informationDate", "Information date cannot be in the future")
        })
    },
    |data, _| {
        data.collected_by
            .trim()
            .is_empty()
            .then(|| ValidationFinding::error("collectedBy", "Collected by is required"))
    },
    |data, _| {
        (data.domestic_violence.is_yes() && !data.domestic_violence_recency.is_collected()).then(
            || {
                ValidationFinding::error(
                    "domesticViolenceRecency",
                    "Recency is required when domestic violence history is reported",
                )
            },
        )
    },
    |data, _| {
        (!data.domestic_violence.is_yes()
            && data.domestic_violence_recency != DomesticViolenceRecency::DataNotCollected)
            .then(|| {
                ValidationFinding::error(
                    "domesticViolenceRecency",
                    "Recency must not be collected without a domestic violence history",
                )
            })
    },
    |data, _| {
        (!data.domestic_violence.is_yes()
            && data.currently_fleeing != HmisResponse::DataNotCollected)
            .then(|| {
                ValidationFinding::error(
                    "currentlyFleeing",
                    "Currently fleeing must not be collected without a domestic violence history",
                )
            })
    },
    |data, _| match (data.income_from_any_source, data.total_monthly_income) {
        (HmisResponse::No, Some(total)) if total > 0 => Some(ValidationFinding::error(
            "totalMonthlyIncome",
            "Total monthly income must be 0 when no income is reported",
        )),
        (HmisResponse::Yes, None | Some(0)) => Some(ValidationFinding::error(
            "totalMonthlyIncome",
            "Total monthly income must be greater than 0 when income is reported",
        )),
        _ => None,
    },
    |data, _| {
        (data.residential_move_in_date.is_some()
            && data.move_in_type == MoveInType::DataNotCollected)
            .then(|| {
                ValidationFinding::error(
                    "moveInType",
                    "Move-in type is required when a move-in date is recorded",
                )
            })
    },
    |data, _| {
        (data.residential_move_in_date.is_none()
            && data.move_in_type != MoveInType::DataNotCollected)
            .then(|| {
                ValidationFinding::error(
                    "residentialMoveInDate",
                    "Move-in date is required when a move-in type is recorded",
                )
            })
    },
    |data, _| {
        (data.vawa_confidentiality_requested
            && data.dv_redaction_level == DvRedactionLevel::NoRedaction)
            .then(|| {
                ValidationFinding::error(
                    "dvRedactionLevel",
                    "VAWA confidentiality requires a redaction level",
                )
            })
    },
    |data, _| {
        (data.currently_fleeing.is_yes() && data.dv_redaction_level == DvRedactionLevel::NoRedaction)
            .then(|| {
                ValidationFinding::warning(
                    "dvRedactionLevel",
                    "Client is currently fleeing; consider redacting DV information",
                )
            })
    },
];

/// Validates a PSDE payload; unknown responses block only at full data-quality stages.
pub fn validate_psde_payload(payload: &PsdePayload, today: NaiveDate) -> ValidationReport {
    let mut findings: Vec<ValidationFinding> = RULES
        .iter()
        .filter_map(|rule| rule(payload, today))
        .collect();
    findings.extend(data_quality(payload));
    ValidationReport::from_findings(findings)
}

fn data_quality(payload: &PsdePayload) -> Vec<ValidationFinding> {
    let strict = payload.collection_stage.requires_full_data_quality();
    let finding = |field: &str, message: String| {
        if strict {
            ValidationFinding::error(field, message)
        } else {
            ValidationFinding::warning(field, message)
        }
    };

    let mut responses = vec![
        ("incomeFromAnySource", payload.income_from_any_source),
        ("coveredByHealthInsurance", payload.covered_by_health_insurance),
        ("domesticViolence", payload.domestic_violence),
    ];
    responses.extend(payload.disability_responses());

    responses
        .into_iter()
        .filter(|(_, response)| !response.is_known())
        .map(|(field, response)| {
            finding(
                field,
                format!("{field} is '{}'; a Yes or No response is expected", response.label()),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::psde::domain::CollectionStage;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).expect("valid date")
    }

    fn complete() -> PsdePayload {
        PsdePayload {
            information_date: Some(today()),
            collected_by: "amy".to_string(),
            income_from_any_source: HmisResponse::No,
            total_monthly_income: Some(0),
            covered_by_health_insurance: HmisResponse::Yes,
            physical_disability: HmisResponse::No,
            developmental_disability: HmisResponse::No,
            chronic_health_condition: HmisResponse::No,
            hiv_aids: HmisResponse::No,
            mental_health_disorder: HmisResponse::No,
            substance_use_disorder: HmisResponse::No,
            domestic_violence: HmisResponse::No,
            ..PsdePayload::default()
        }
    }

    #[test]
    fn complete_payload_is_clean() {
        let report = validate_psde_payload(&complete(), today());
        assert!(report.is_valid, "{report:?}");
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn required_fields_are_reported_together() {
        let payload = PsdePayload {
            information_date: None,
            collected_by: " ".to_string(),
            ..complete()
        };
        let report = validate_psde_payload(&payload, today());
        assert!(report.has_error_on("informationDate"));
        assert!(report.has_error_on("collectedBy"));
    }

    #[test]
    fn dv_follow_ups_depend_on_history() {
        let without_recency = PsdePayload {
            domestic_violence: HmisResponse::Yes,
            ..complete()
        };
        let report = validate_psde_payload(&without_recency, today());
        assert_eq!(report.errors_for("domesticViolenceRecency").len(), 1);

        let follow_ups_without_history = PsdePayload {
            domestic_violence: HmisResponse::ClientPrefersNotToAnswer,
            currently_fleeing: HmisResponse::No,
            ..complete()
        };
        let report = validate_psde_payload(&follow_ups_without_history, today());
        assert!(report.has_error_on("currentlyFleeing"));
    }

    #[test]
    fn income_total_must_agree_with_the_response() {
        let payload = PsdePayload {
            total_monthly_income: Some(400),
            ..complete()
        };
        assert!(validate_psde_payload(&payload, today()).has_error_on("totalMonthlyIncome"));
    }

    #[test]
    fn move_in_fields_travel_together() {
        let payload = PsdePayload {
            move_in_type: MoveInType::RapidRehousing,
            ..complete()
        };
        assert!(validate_psde_payload(&payload, today()).has_error_on("residentialMoveInDate"));
    }

    #[test]
    fn unknown_responses_block_only_comprehensive_collection() {
        let intake = PsdePayload {
            hiv_aids: HmisResponse::ClientDoesntKnow,
            ..complete()
        };
        let report = validate_psde_payload(&intake, today());
        assert!(report.is_valid);
        assert!(report.has_warning_on("hivAids"));

        let assessment = PsdePayload {
            collection_stage: CollectionStage::ComprehensiveAssessment,
            ..intake
        };
        assert!(validate_psde_payload(&assessment, today()).has_error_on("hivAids"));
    }

    #[test]
    fn vawa_request_needs_a_redaction_level() {
        let payload = PsdePayload {
            vawa_confidentiality_requested: true,
            ..complete()
        };
        assert!(validate_psde_payload(&payload, today()).has_error_on("dvRedactionLevel"));
    }
}
