mod config;
mod policy;
mod risk;
mod rules;

pub use config::{AmiTableError, AreaMedianIncome, EligibilityConfig};
pub use policy::IneligibilityReason;
pub use risk::{calculate_overall_risk_level, should_auto_route_to_safety, RiskAssessment};
pub use rules::{classify_homeless_category, is_chronically_homeless};

use serde::{Deserialize, Serialize};

use crate::workflows::codes::{HmisResponse, HomelessCategory, PriorLivingSituation, ProgramType};

/// Facts the calculator needs, gathered from the housing, household, income, and health stages.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EligibilityInput {
    pub prior_living_situation: PriorLivingSituation,
    pub fleeing_domestic_violence: bool,
    pub losing_housing_within_fourteen_days: bool,
    pub homeless_under_other_statute: bool,
    pub months_homeless_past_three_years: u16,
    pub times_homeless_past_three_years: u16,
    pub disabling_condition: HmisResponse,
    pub monthly_income: u32,
    pub household_size: u8,
}

/// Derived eligibility; advisory until staff select a program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityResult {
    pub homeless_category: HomelessCategory,
    pub chronically_homeless: bool,
    pub eligible_for_th: bool,
    pub eligible_for_rrh: bool,
    pub eligible_for_psh: bool,
    pub eligible_for_other: Vec<ProgramType>,
    pub ineligibility_reasons: Vec<IneligibilityReason>,
    pub recommended_program: Option<ProgramType>,
    pub recommended_program_id: Option<String>,
    pub recommendation_reason: String,
}

impl EligibilityResult {
    pub fn is_eligible_for(&self, program: ProgramType) -> bool {
        match program {
            ProgramType::TransitionalHousing => self.eligible_for_th,
            ProgramType::RapidRehousing => self.eligible_for_rrh,
            ProgramType::PermanentSupportiveHousing => self.eligible_for_psh,
            other => self.eligible_for_other.contains(&other),
        }
    }

    pub fn eligible_programs(&self) -> Vec<ProgramType> {
        let mut programs = Vec::new();
        if self.eligible_for_psh {
            programs.push(ProgramType::PermanentSupportiveHousing);
        }
        if self.eligible_for_rrh {
            programs.push(ProgramType::RapidRehousing);
        }
        if self.eligible_for_th {
            programs.push(ProgramType::TransitionalHousing);
        }
        programs.extend(self.eligible_for_other.iter().copied());
        programs
    }

    pub fn reason_summaries(&self) -> Vec<String> {
        self.ineligibility_reasons
            .iter()
            .map(IneligibilityReason::summary)
            .collect()
    }
}

/// Stateless calculator that applies the jurisdiction configuration.
#[derive(Debug, Clone, Default)]
pub struct EligibilityEngine {
    config: EligibilityConfig,
}

impl EligibilityEngine {
    pub fn new(config: EligibilityConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EligibilityConfig {
        &self.config
    }

    pub fn determine(&self, input: &EligibilityInput) -> EligibilityResult {
        let homeless_category = classify_homeless_category(input);
        let chronically_homeless = is_chronically_homeless(
            input.months_homeless_past_three_years,
            input.times_homeless_past_three_years,
        );

        let checks = rules::check_programs(
            input,
            homeless_category,
            chronically_homeless,
            &self.config,
        );
        let (recommended_program, recommendation_reason) = policy::recommend(
            checks.transitional,
            checks.rapid_rehousing,
            checks.permanent_supportive,
            &checks.other,
            homeless_category,
        );
        let recommended_program_id = recommended_program
            .and_then(|program| self.config.program_id(program))
            .map(str::to_string);

        EligibilityResult {
            homeless_category,
            chronically_homeless,
            eligible_for_th: checks.transitional,
            eligible_for_rrh: checks.rapid_rehousing,
            eligible_for_psh: checks.permanent_supportive,
            eligible_for_other: checks.other,
            ineligibility_reasons: checks.reasons,
            recommended_program,
            recommended_program_id,
            recommendation_reason,
        }
    }
}

/// Convenience wrapper using the default federal configuration.
pub fn determine_eligibility(input: &EligibilityInput) -> EligibilityResult {
    EligibilityEngine::default().determine(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chronic_shelter_stayer() -> EligibilityInput {
        EligibilityInput {
            prior_living_situation: PriorLivingSituation::EmergencyShelter,
            months_homeless_past_three_years: 14,
            times_homeless_past_three_years: 2,
            disabling_condition: HmisResponse::Yes,
            monthly_income: 900,
            household_size: 1,
            ..EligibilityInput::default()
        }
    }

    #[test]
    fn chronic_disabled_client_is_recommended_psh() {
        let result = determine_eligibility(&chronic_shelter_stayer());

        assert_eq!(result.homeless_category, HomelessCategory::LiterallyHomeless);
        assert!(result.chronically_homeless);
        assert!(result.eligible_for_th && result.eligible_for_rrh && result.eligible_for_psh);
        assert_eq!(
            result.recommended_program,
            Some(ProgramType::PermanentSupportiveHousing)
        );
        assert_eq!(result.recommended_program_id.as_deref(), Some("psh-coc-001"));
        assert!(result.ineligibility_reasons.is_empty());
    }

    #[test]
    fn chronic_without_disability_is_not_psh_eligible() {
        let mut input = chronic_shelter_stayer();
        input.disabling_condition = HmisResponse::No;

        let result = determine_eligibility(&input);

        assert!(result.chronically_homeless);
        assert!(!result.eligible_for_psh);
        assert_eq!(result.recommended_program, Some(ProgramType::RapidRehousing));
        assert!(result.ineligibility_reasons.iter().any(|reason| matches!(
            reason,
            IneligibilityReason::NoDisablingCondition { .. }
        )));
    }

    #[test]
    fn every_disqualifier_is_reported() {
        let input = EligibilityInput {
            prior_living_situation: PriorLivingSituation::RentalNoSubsidy,
            monthly_income: 9_000,
            household_size: 2,
            ..EligibilityInput::default()
        };

        let result = determine_eligibility(&input);

        assert_eq!(result.homeless_category, HomelessCategory::NotHomeless);
        assert!(result.eligible_programs().is_empty());
        // TH, RRH, PSH category + RRH income + not chronic + no disability.
        assert_eq!(result.ineligibility_reasons.len(), 6);
        assert_eq!(result.recommended_program, None);
    }

    #[test]
    fn income_gate_uses_injected_ami() {
        let mut limits = std::collections::BTreeMap::new();
        limits.insert(1, 20_000);
        let config = EligibilityConfig::default()
            .with_area_median_income(AreaMedianIncome::new(limits).expect("valid table"));
        let engine = EligibilityEngine::new(config);

        let mut input = chronic_shelter_stayer();
        input.disabling_condition = HmisResponse::No;
        input.monthly_income = 1_000;

        let result = engine.determine(&input);

        assert!(!result.eligible_for_rrh);
        assert!(result.eligible_for_th);
        assert_eq!(
            result.recommended_program,
            Some(ProgramType::TransitionalHousing)
        );
        assert!(result.ineligibility_reasons.iter().any(|reason| matches!(
            reason,
            IneligibilityReason::IncomeAboveLimit {
                program: ProgramType::RapidRehousing,
                annual_income: 12_000,
                limit: 10_000,
            }
        )));
    }

    #[test]
    fn fleeing_dv_unlocks_dv_services() {
        let input = EligibilityInput {
            prior_living_situation: PriorLivingSituation::RentalNoSubsidy,
            fleeing_domestic_violence: true,
            household_size: 3,
            monthly_income: 1_200,
            ..EligibilityInput::default()
        };

        let result = determine_eligibility(&input);

        assert_eq!(
            result.homeless_category,
            HomelessCategory::FleeingDomesticViolence
        );
        assert!(result.is_eligible_for(ProgramType::DvServices));
        assert!(result.is_eligible_for(ProgramType::EmergencyShelter));
        assert!(result.eligible_for_rrh);
    }

    #[test]
    fn imminent_risk_low_income_gets_prevention() {
        let input = EligibilityInput {
            prior_living_situation: PriorLivingSituation::StayingWithFriends,
            losing_housing_within_fourteen_days: true,
            household_size: 2,
            monthly_income: 1_000,
            ..EligibilityInput::default()
        };

        let result = determine_eligibility(&input);

        assert_eq!(result.homeless_category, HomelessCategory::ImminentRisk);
        assert_eq!(
            result.eligible_for_other,
            vec![
                ProgramType::EmergencyShelter,
                ProgramType::HomelessnessPrevention
            ]
        );
        assert_eq!(
            result.recommended_program,
            Some(ProgramType::EmergencyShelter)
        );
    }
}
