use super::rules::{digit_count, is_blank, not_before, not_in_future, required_date, run_rules, Rule};
use super::{ValidationContext, ValidationFinding};
use crate::workflows::codes::{
    DomesticViolenceRecency, DvRedactionLevel, HmisResponse, LengthOfStay, LethalityLevel,
    PriorLivingSituation, RiskLevel,
};
use crate::workflows::intake::domain::{
    ConsentPayload, ContactMethod, HealthAndDvPayload, HouseholdPayload, HousingHistoryPayload,
    IdentityPayload, IncomePayload, InitialContactPayload, ProgramSelectionPayload,
    SafetyScreeningPayload, ServicePlanPayload,
};
use crate::workflows::intake::eligibility::RiskAssessment;

const MAX_MONTHS_IN_LOOKBACK: u16 = 36;
const MAX_PLAUSIBLE_AGE: u32 = 120;
const MAX_PLAUSIBLE_HOUSEHOLD: u8 = 20;

// Stage 1: initial contact.

const INITIAL_CONTACT_RULES: &[Rule<InitialContactPayload>] = &[
    |data, _| {
        is_blank(data.client_alias.as_deref()).then(|| {
            ValidationFinding::error("clientAlias", "Client alias or first name is required")
        })
    },
    |data, _| required_date("contactDate", "Contact date", data.contact_date),
    |data, ctx| not_in_future("contactDate", "Contact date", data.contact_date, ctx.today),
    |data, _| {
        data.safe_contact_method.is_none().then(|| {
            ValidationFinding::warning(
                "safeContactMethod",
                "No safe contact method recorded; staff must not initiate contact",
            )
        })
    },
    |data, _| match data.safe_contact_method {
        Some(ContactMethod::Phone | ContactMethod::Text) if is_blank(data.safe_phone.as_deref()) => {
            Some(ValidationFinding::error(
                "safePhone",
                "A safe phone number is required when phone or text is the safe contact method",
            ))
        }
        _ => None,
    },
    |data, _| match data.safe_phone.as_deref() {
        Some(phone) if !phone.trim().is_empty() && digit_count(phone) < 10 => Some(
            ValidationFinding::error("safePhone", "Safe phone number must have at least 10 digits"),
        ),
        _ => None,
    },
    |data, _| match (data.safe_contact_method, data.okay_to_leave_message) {
        (Some(ContactMethod::Phone), None) => Some(ValidationFinding::warning(
            "okayToLeaveMessage",
            "Confirm whether it is safe to leave a voicemail",
        )),
        _ => None,
    },
];

pub(crate) fn initial_contact(
    data: &InitialContactPayload,
    context: &ValidationContext,
) -> Vec<ValidationFinding> {
    run_rules(data, context, INITIAL_CONTACT_RULES)
}

// Stage 2: safety and lethality screening. Nothing here may block a client in crisis.

const SAFETY_RULES: &[Rule<SafetyScreeningPayload>] = &[
    |data, ctx| {
        not_in_future(
            "screeningDate",
            "Screening date",
            data.screening_date,
            ctx.today,
        )
    },
    |data, ctx| {
        not_before(
            "screeningDate",
            "Screening date",
            data.screening_date,
            "contact date",
            ctx.contact_date,
        )
    },
    |data, _| {
        (data.lethality_level == LethalityLevel::NotScreened).then(|| {
            ValidationFinding::warning(
                "lethalityLevel",
                "Lethality screening not completed; offer the screen when it is safe to do so",
            )
        })
    },
    |data, _| {
        data.currently_safe.is_none().then(|| {
            ValidationFinding::warning("currentlySafe", "Current safety was not answered")
        })
    },
    |data, _| {
        data.has_safe_place.is_none().then(|| {
            ValidationFinding::warning("hasSafePlace", "Safe place to stay was not answered")
        })
    },
    |data, _| {
        data.needs_shelter.is_none().then(|| {
            ValidationFinding::warning("needsShelter", "Shelter need was not answered")
        })
    },
    |data, _| {
        let assessment = RiskAssessment::from_screening(data);
        matches!(assessment.risk_level, RiskLevel::High | RiskLevel::Severe).then(|| {
            ValidationFinding::warning(
                "riskLevel",
                format!(
                    "{} risk: route to safety planning before continuing intake",
                    assessment.risk_level.label()
                ),
            )
        })
    },
    |data, _| {
        (data.currently_safe == Some(false) && !data.safety_plan_started).then(|| {
            ValidationFinding::warning(
                "safetyPlanStarted",
                "Client is not currently safe and no safety plan has been started",
            )
        })
    },
];

pub(crate) fn safety_screening(
    data: &SafetyScreeningPayload,
    context: &ValidationContext,
) -> Vec<ValidationFinding> {
    run_rules(data, context, SAFETY_RULES)
}

// Stage 3: consent. Only consent to services blocks.

const CONSENT_RULES: &[Rule<ConsentPayload>] = &[
    |data, _| {
        (data.consent_to_services != Some(true)).then(|| {
            ValidationFinding::error(
                "consentToServices",
                "Consent to services is required before identifying information is collected",
            )
        })
    },
    |data, _| match data.consent_to_data_sharing {
        Some(true) => None,
        Some(false) => Some(ValidationFinding::warning(
            "consentToDataSharing",
            "Client declined data sharing; record stays within this agency",
        )),
        None => Some(ValidationFinding::warning(
            "consentToDataSharing",
            "Data sharing preference not recorded",
        )),
    },
    |data, _| match data.hmis_participation {
        Some(true) => None,
        Some(false) => Some(ValidationFinding::warning(
            "hmisParticipation",
            "Client declined HMIS participation; only de-identified data will be reported",
        )),
        None => Some(ValidationFinding::warning(
            "hmisParticipation",
            "HMIS participation preference not recorded",
        )),
    },
    |data, _| required_date("consentDate", "Consent date", data.consent_date),
    |data, ctx| not_in_future("consentDate", "Consent date", data.consent_date, ctx.today),
    |data, ctx| {
        not_before(
            "consentDate",
            "Consent date",
            data.consent_date,
            "contact date",
            ctx.contact_date,
        )
    },
    |data, _| match (data.vawa_confidentiality_requested, data.dv_redaction_level) {
        (true, DvRedactionLevel::NoRedaction) => Some(ValidationFinding::error(
            "dvRedactionLevel",
            "A redaction level is required when VAWA confidentiality is requested",
        )),
        (true, level) if !level.honors_vawa_request() => Some(ValidationFinding::warning(
            "dvRedactionLevel",
            format!(
                "'{}' only partially protects a VAWA confidentiality request",
                level.label()
            ),
        )),
        _ => None,
    },
];

pub(crate) fn consent(data: &ConsentPayload, context: &ValidationContext) -> Vec<ValidationFinding> {
    run_rules(data, context, CONSENT_RULES)
}

// Stage 4: identity and demographics.

const IDENTITY_RULES: &[Rule<IdentityPayload>] = &[
    |data, _| {
        (!data.anonymous && is_blank(data.first_name.as_deref())).then(|| {
            ValidationFinding::error(
                "firstName",
                "First name is required unless the client is recorded anonymously",
            )
        })
    },
    |data, _| {
        (!data.anonymous && is_blank(data.last_name.as_deref())).then(|| {
            ValidationFinding::warning("lastName", "Last name missing; deduplication may fail")
        })
    },
    |data, _| {
        data.anonymous.then(|| {
            ValidationFinding::warning(
                "anonymous",
                "Anonymous records are excluded from HMIS deduplication",
            )
        })
    },
    |data, _| {
        data.date_of_birth.is_none().then(|| {
            ValidationFinding::warning("dateOfBirth", "Date of birth not recorded")
        })
    },
    |data, ctx| not_in_future("dateOfBirth", "Date of birth", data.date_of_birth, ctx.today),
    |data, ctx| match (data.date_of_birth, ctx.contact_date) {
        (Some(dob), Some(contact)) if dob > contact => Some(ValidationFinding::error(
            "dateOfBirth",
            format!("Date of birth ({dob}) cannot be after the contact date ({contact})"),
        )),
        _ => None,
    },
    |data, ctx| match data.date_of_birth {
        Some(dob) if ctx.today.years_since(dob).is_some_and(|age| age > MAX_PLAUSIBLE_AGE) => {
            Some(ValidationFinding::warning(
                "dateOfBirth",
                format!("Date of birth {dob} implies an age over {MAX_PLAUSIBLE_AGE}"),
            ))
        }
        _ => None,
    },
    |data, _| match data.ssn.as_deref() {
        Some(ssn) if !ssn.trim().is_empty() => {
            let digits: String = ssn.chars().filter(char::is_ascii_digit).collect();
            if digits.len() != 9 || ssn.chars().any(|c| !c.is_ascii_digit() && c != '-') {
                Some(ValidationFinding::error("ssn", "SSN must contain exactly 9 digits"))
            } else if digits.chars().all(|c| c == '0') {
                Some(ValidationFinding::error("ssn", "SSN cannot be all zeros"))
            } else {
                None
            }
        }
        _ => None,
    },
    |data, _| {
        (!data.veteran_status.is_known()).then(|| {
            ValidationFinding::warning(
                "veteranStatus",
                format!("Veteran status is '{}'", data.veteran_status.label()),
            )
        })
    },
];

pub(crate) fn identity(data: &IdentityPayload, context: &ValidationContext) -> Vec<ValidationFinding> {
    run_rules(data, context, IDENTITY_RULES)
}

// Stage 5: housing history.

const HOUSING_RULES: &[Rule<HousingHistoryPayload>] = &[
    |data, _| match data.prior_living_situation {
        PriorLivingSituation::DataNotCollected => Some(ValidationFinding::error(
            "priorLivingSituation",
            "Prior living situation is required",
        )),
        situation if !situation.is_known() => Some(ValidationFinding::warning(
            "priorLivingSituation",
            format!("Prior living situation is '{}'", situation.label()),
        )),
        _ => None,
    },
    |data, _| {
        (data.length_of_stay == LengthOfStay::DataNotCollected).then(|| {
            ValidationFinding::warning("lengthOfStay", "Length of stay not recorded")
        })
    },
    |data, _| required_date("projectEntryDate", "Project entry date", data.project_entry_date),
    |data, ctx| {
        not_in_future(
            "projectEntryDate",
            "Project entry date",
            data.project_entry_date,
            ctx.today,
        )
    },
    |data, ctx| {
        not_before(
            "projectEntryDate",
            "Project entry date",
            data.project_entry_date,
            "consent date",
            ctx.consent_date,
        )
    },
    |data, ctx| {
        not_in_future(
            "homelessnessStartDate",
            "Homelessness start date",
            data.homelessness_start_date,
            ctx.today,
        )
    },
    |data, _| match (data.homelessness_start_date, data.project_entry_date) {
        (Some(start), Some(entry)) if start > entry => Some(ValidationFinding::error(
            "homelessnessStartDate",
            format!("Homelessness start date ({start}) cannot be after project entry ({entry})"),
        )),
        _ => None,
    },
    |data, _| match data.months_homeless_past_three_years {
        Some(months) if months > MAX_MONTHS_IN_LOOKBACK => Some(ValidationFinding::error(
            "monthsHomelessPastThreeYears",
            format!("Months homeless cannot exceed {MAX_MONTHS_IN_LOOKBACK} in a three-year lookback"),
        )),
        None => Some(ValidationFinding::warning(
            "monthsHomelessPastThreeYears",
            "Months homeless not recorded; chronic status cannot be fully determined",
        )),
        _ => None,
    },
    |data, _| {
        data.times_homeless_past_three_years.is_none().then(|| {
            ValidationFinding::warning(
                "timesHomelessPastThreeYears",
                "Episodes of homelessness not recorded; chronic status cannot be fully determined",
            )
        })
    },
    |data, _| {
        (data.prior_living_situation.is_literally_homeless()
            && data.times_homeless_past_three_years == Some(0))
        .then(|| {
            ValidationFinding::warning(
                "timesHomelessPastThreeYears",
                "Client came from a homeless situation but reports zero episodes",
            )
        })
    },
];

pub(crate) fn housing_history(
    data: &HousingHistoryPayload,
    context: &ValidationContext,
) -> Vec<ValidationFinding> {
    run_rules(data, context, HOUSING_RULES)
}

// Stage 6: household composition.

const HOUSEHOLD_RULES: &[Rule<HouseholdPayload>] = &[
    |data, _| {
        (data.adults == 0).then(|| {
            ValidationFinding::error("adults", "A household needs at least one adult")
        })
    },
    |data, _| {
        (u16::from(data.total_size) != data.expected_total()).then(|| {
            ValidationFinding::error(
                "totalSize",
                format!(
                    "Household size {} does not equal {} adult(s) plus {} child(ren)",
                    data.total_size, data.adults, data.children
                ),
            )
        })
    },
    |data, _| {
        (!data.members.is_empty() && data.members.len() != usize::from(data.total_size)).then(
            || {
                ValidationFinding::error(
                    "members",
                    format!(
                        "{} member(s) listed for a household of {}",
                        data.members.len(),
                        data.total_size
                    ),
                )
            },
        )
    },
    |data, _| {
        let listed_adults = data.members.iter().filter(|member| member.is_adult).count();
        (!data.members.is_empty() && listed_adults != usize::from(data.adults)).then(|| {
            ValidationFinding::warning(
                "members",
                format!(
                    "{listed_adults} member(s) marked adult but {} adult(s) reported",
                    data.adults
                ),
            )
        })
    },
    |data, ctx| {
        data.members
            .iter()
            .find_map(|member| member.date_of_birth.filter(|dob| *dob > ctx.today))
            .map(|dob| {
                ValidationFinding::error(
                    "members",
                    format!("Household member date of birth ({dob}) cannot be in the future"),
                )
            })
    },
    |data, _| {
        (data.total_size > MAX_PLAUSIBLE_HOUSEHOLD).then(|| {
            ValidationFinding::warning(
                "totalSize",
                format!("Household of {} is unusually large; confirm", data.total_size),
            )
        })
    },
];

pub(crate) fn household(
    data: &HouseholdPayload,
    context: &ValidationContext,
) -> Vec<ValidationFinding> {
    run_rules(data, context, HOUSEHOLD_RULES)
}

// Stage 7: income and benefits.

const INCOME_RULES: &[Rule<IncomePayload>] = &[
    |data, ctx| {
        not_in_future(
            "informationDate",
            "Income information date",
            data.information_date,
            ctx.today,
        )
    },
    |data, ctx| match (data.information_date, ctx.project_entry_date) {
        (Some(info), Some(entry)) if info < entry => Some(ValidationFinding::warning(
            "informationDate",
            format!("Income information date ({info}) precedes project entry ({entry})"),
        )),
        _ => None,
    },
    |data, _| match data.income_from_any_source {
        HmisResponse::Yes if data.total_monthly_income.unwrap_or(0) == 0 => {
            Some(ValidationFinding::error(
                "totalMonthlyIncome",
                "Total monthly income must be greater than 0 when income from any source is 'Yes'",
            ))
        }
        HmisResponse::No if data.total_monthly_income.unwrap_or(0) > 0 => {
            Some(ValidationFinding::error(
                "totalMonthlyIncome",
                "Total monthly income must be 0 when income from any source is 'No'",
            ))
        }
        _ => None,
    },
    |data, _| match data.income_from_any_source {
        HmisResponse::Yes if data.sources.is_empty() => Some(ValidationFinding::error(
            "incomeSources",
            "At least one income source is required when income from any source is 'Yes'",
        )),
        HmisResponse::No if !data.sources.is_empty() => Some(ValidationFinding::error(
            "incomeSources",
            "Income sources cannot be listed when income from any source is 'No'",
        )),
        _ => None,
    },
    |data, _| {
        (!data.income_from_any_source.is_known()).then(|| {
            ValidationFinding::warning(
                "incomeFromAnySource",
                format!(
                    "Income from any source is '{}'",
                    data.income_from_any_source.label()
                ),
            )
        })
    },
    |data, _| {
        let listed: u64 = data
            .sources
            .iter()
            .map(|entry| u64::from(entry.monthly_amount))
            .sum();
        match data.total_monthly_income {
            Some(total) if !data.sources.is_empty() && listed != u64::from(total) => {
                Some(ValidationFinding::warning(
                    "totalMonthlyIncome",
                    format!("Income sources sum to ${listed} but total is ${total}"),
                ))
            }
            _ => None,
        }
    },
    |data, _| {
        (!data.covered_by_health_insurance.is_known()).then(|| {
            ValidationFinding::warning(
                "coveredByHealthInsurance",
                format!(
                    "Health insurance coverage is '{}'",
                    data.covered_by_health_insurance.label()
                ),
            )
        })
    },
];

pub(crate) fn income(data: &IncomePayload, context: &ValidationContext) -> Vec<ValidationFinding> {
    run_rules(data, context, INCOME_RULES)
}

// Stage 8: health, disability, and domestic violence.

const HEALTH_DV_RULES: &[Rule<HealthAndDvPayload>] = &[
    |data, ctx| {
        not_in_future(
            "informationDate",
            "Information date",
            data.information_date,
            ctx.today,
        )
    },
    |data, _| {
        let recency_missing = matches!(
            data.domestic_violence_recency,
            DomesticViolenceRecency::DataNotCollected
        );
        match data.domestic_violence {
            HmisResponse::Yes if recency_missing => Some(ValidationFinding::error(
                "domesticViolenceRecency",
                "DV recency is required when DV history is 'Yes'",
            )),
            HmisResponse::Yes => None,
            response if data.domestic_violence_recency.is_collected() => {
                Some(ValidationFinding::error(
                    "domesticViolenceRecency",
                    format!(
                        "DV recency must not be collected when DV history is '{}'",
                        response.label()
                    ),
                ))
            }
            _ => None,
        }
    },
    |data, _| match data.domestic_violence {
        HmisResponse::Yes if !data.currently_fleeing.is_collected() => {
            Some(ValidationFinding::warning(
                "currentlyFleeing",
                "Ask whether the client is currently fleeing",
            ))
        }
        HmisResponse::Yes => None,
        response if data.currently_fleeing.is_collected() => Some(ValidationFinding::error(
            "currentlyFleeing",
            format!(
                "Currently fleeing must not be collected when DV history is '{}'",
                response.label()
            ),
        )),
        _ => None,
    },
    |data, _| {
        (!data.domestic_violence.is_known()).then(|| {
            ValidationFinding::warning(
                "domesticViolence",
                format!(
                    "DV history is '{}'; HMIS data quality expects Yes or No",
                    data.domestic_violence.label()
                ),
            )
        })
    },
    |data, ctx| {
        let unprotected = matches!(
            ctx.dv_redaction_level,
            None | Some(DvRedactionLevel::NoRedaction)
        );
        (data.currently_fleeing.is_yes() && unprotected).then(|| {
            ValidationFinding::warning(
                "dvRedactionLevel",
                "Client is currently fleeing; consider an enhanced redaction level",
            )
        })
    },
    |data, _| {
        (!data.disabling_condition.is_known()).then(|| {
            ValidationFinding::warning(
                "disablingCondition",
                format!(
                    "Disabling condition is '{}'",
                    data.disabling_condition.label()
                ),
            )
        })
    },
    |data, _| {
        let any_disability = data
            .disability_responses()
            .iter()
            .any(|(_, response)| response.is_yes());
        (data.disabling_condition.is_yes() && !any_disability).then(|| {
            ValidationFinding::warning(
                "disablingCondition",
                "Disabling condition is 'Yes' but no disability type is marked 'Yes'",
            )
        })
    },
];

pub(crate) fn health_and_dv(
    data: &HealthAndDvPayload,
    context: &ValidationContext,
) -> Vec<ValidationFinding> {
    let mut findings = run_rules(data, context, HEALTH_DV_RULES);
    findings.extend(
        data.disability_responses()
            .into_iter()
            .filter(|(_, response)| !response.is_known())
            .map(|(field, response)| {
                ValidationFinding::warning(
                    field,
                    format!(
                        "'{}' counts against HMIS data quality",
                        response.label()
                    ),
                )
            }),
    );
    findings
}

// Stage 9: eligibility and program selection.

const PROGRAM_SELECTION_RULES: &[Rule<ProgramSelectionPayload>] = &[
    |data, _| {
        data.selected_program.is_none().then(|| {
            ValidationFinding::error("selectedProgram", "Select a program to refer the client to")
        })
    },
    |_, ctx| {
        ctx.eligibility.is_none().then(|| {
            ValidationFinding::error(
                "eligibility",
                "Eligibility has not been determined; complete stages 5 through 8 first",
            )
        })
    },
    |data, ctx| {
        let (Some(program), Some(eligibility)) = (data.selected_program, ctx.eligibility.as_ref())
        else {
            return None;
        };
        if eligibility.is_eligible_for(program) {
            return None;
        }
        if is_blank(data.override_justification.as_deref()) {
            Some(ValidationFinding::error(
                "selectedProgram",
                format!(
                    "Client is not eligible for {}; choose an eligible program or document an override",
                    program.label()
                ),
            ))
        } else {
            Some(ValidationFinding::warning(
                "selectedProgram",
                format!("{} selected by override", program.label()),
            ))
        }
    },
    |data, ctx| {
        let (Some(program), Some(eligibility)) = (data.selected_program, ctx.eligibility.as_ref())
        else {
            return None;
        };
        match eligibility.recommended_program {
            Some(recommended) if recommended != program => Some(ValidationFinding::warning(
                "selectedProgram",
                format!(
                    "Selected {} differs from recommended {}",
                    program.label(),
                    recommended.label()
                ),
            )),
            _ => None,
        }
    },
];

pub(crate) fn program_selection(
    data: &ProgramSelectionPayload,
    context: &ValidationContext,
) -> Vec<ValidationFinding> {
    run_rules(data, context, PROGRAM_SELECTION_RULES)
}

// Stage 10: documents and service plan.

pub(crate) fn service_plan(
    data: &ServicePlanPayload,
    context: &ValidationContext,
) -> Vec<ValidationFinding> {
    let mut findings = Vec::new();

    for (index, document) in data.documents.iter().enumerate() {
        if document.name.trim().is_empty() {
            findings.push(ValidationFinding::error(
                format!("documents[{index}].name"),
                "Document name is required",
            ));
        }
        if document.category.is_none() {
            findings.push(ValidationFinding::error(
                format!("documents[{index}].category"),
                "Document category is required",
            ));
        }
    }

    for (index, goal) in data.goals.iter().enumerate() {
        if goal.description.trim().is_empty() {
            findings.push(ValidationFinding::error(
                format!("goals[{index}].description"),
                "Goal description is required",
            ));
        }
        if let (Some(target), Some(entry)) = (goal.target_date, context.project_entry_date) {
            if target < entry {
                findings.push(ValidationFinding::warning(
                    format!("goals[{index}].targetDate"),
                    format!("Target date ({target}) is before project entry ({entry})"),
                ));
            }
        }
    }

    if data.documents.is_empty() {
        findings.push(ValidationFinding::warning(
            "documents",
            "No documents recorded; homeless verification may be needed at enrollment",
        ));
    }

    findings
}
