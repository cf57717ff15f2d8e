use crate::workflows::codes::{HmisResponse, HomelessCategory, ProgramType};

use super::config::EligibilityConfig;
use super::policy::IneligibilityReason;
use super::EligibilityInput;

pub(crate) const CHRONIC_MONTHS_THRESHOLD: u16 = 12;
pub(crate) const CHRONIC_EPISODES_THRESHOLD: u16 = 4;

/// Fleeing DV wins over every living-situation code.
pub fn classify_homeless_category(input: &EligibilityInput) -> HomelessCategory {
    if input.fleeing_domestic_violence {
        return HomelessCategory::FleeingDomesticViolence;
    }
    if input.prior_living_situation.is_literally_homeless() {
        return HomelessCategory::LiterallyHomeless;
    }
    if input.losing_housing_within_fourteen_days {
        return HomelessCategory::ImminentRisk;
    }
    if input.homeless_under_other_statute {
        return HomelessCategory::OtherStatuteHomeless;
    }
    HomelessCategory::NotHomeless
}

/// Either branch is independently sufficient.
pub fn is_chronically_homeless(
    months_homeless_past_three_years: u16,
    times_homeless_past_three_years: u16,
) -> bool {
    months_homeless_past_three_years >= CHRONIC_MONTHS_THRESHOLD
        || times_homeless_past_three_years >= CHRONIC_EPISODES_THRESHOLD
}

pub(crate) fn annual_income(input: &EligibilityInput) -> u64 {
    u64::from(input.monthly_income) * 12
}

pub(crate) struct ProgramChecks {
    pub transitional: bool,
    pub rapid_rehousing: bool,
    pub permanent_supportive: bool,
    pub other: Vec<ProgramType>,
    pub reasons: Vec<IneligibilityReason>,
}

/// Evaluates every program without short-circuiting so all reasons surface.
pub(crate) fn check_programs(
    input: &EligibilityInput,
    category: HomelessCategory,
    chronic: bool,
    config: &EligibilityConfig,
) -> ProgramChecks {
    let mut reasons = Vec::new();
    let qualifying_category = category.qualifies_for_housing_programs();
    let annual = annual_income(input);

    let transitional = qualifying_category;
    if !transitional {
        reasons.push(IneligibilityReason::HomelessCategory {
            program: ProgramType::TransitionalHousing,
            category,
        });
    }

    let rrh_limit = config.income_limit(input.household_size, config.rrh_ami_percent);
    let rrh_income_ok = annual <= rrh_limit;
    if !qualifying_category {
        reasons.push(IneligibilityReason::HomelessCategory {
            program: ProgramType::RapidRehousing,
            category,
        });
    }
    if !rrh_income_ok {
        reasons.push(IneligibilityReason::IncomeAboveLimit {
            program: ProgramType::RapidRehousing,
            annual_income: annual,
            limit: rrh_limit,
        });
    }
    let rapid_rehousing = qualifying_category && rrh_income_ok;

    let disabled = input.disabling_condition == HmisResponse::Yes;
    if !qualifying_category {
        reasons.push(IneligibilityReason::HomelessCategory {
            program: ProgramType::PermanentSupportiveHousing,
            category,
        });
    }
    if !chronic {
        reasons.push(IneligibilityReason::NotChronicallyHomeless {
            months: input.months_homeless_past_three_years,
            episodes: input.times_homeless_past_three_years,
        });
    }
    if !disabled {
        reasons.push(IneligibilityReason::NoDisablingCondition {
            response: input.disabling_condition,
        });
    }
    let permanent_supportive = qualifying_category && chronic && disabled;

    let mut other = Vec::new();
    if category.is_homeless() {
        other.push(ProgramType::EmergencyShelter);
    }
    if category == HomelessCategory::ImminentRisk {
        let prevention_limit =
            config.income_limit(input.household_size, config.prevention_ami_percent);
        if annual <= prevention_limit {
            other.push(ProgramType::HomelessnessPrevention);
        } else {
            reasons.push(IneligibilityReason::IncomeAboveLimit {
                program: ProgramType::HomelessnessPrevention,
                annual_income: annual,
                limit: prevention_limit,
            });
        }
    }
    if input.fleeing_domestic_violence {
        other.push(ProgramType::DvServices);
    }

    ProgramChecks {
        transitional,
        rapid_rehousing,
        permanent_supportive,
        other,
        reasons,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::codes::PriorLivingSituation;

    #[test]
    fn chronic_branches_are_independent() {
        assert!(is_chronically_homeless(0, 4));
        assert!(is_chronically_homeless(12, 0));
        assert!(!is_chronically_homeless(11, 3));
    }

    #[test]
    fn fleeing_dv_overrides_living_situation() {
        let input = EligibilityInput {
            prior_living_situation: PriorLivingSituation::RentalNoSubsidy,
            fleeing_domestic_violence: true,
            ..EligibilityInput::default()
        };
        assert_eq!(
            classify_homeless_category(&input),
            HomelessCategory::FleeingDomesticViolence
        );
    }

    #[test]
    fn classifies_remaining_categories() {
        let mut input = EligibilityInput {
            prior_living_situation: PriorLivingSituation::EmergencyShelter,
            ..EligibilityInput::default()
        };
        assert_eq!(
            classify_homeless_category(&input),
            HomelessCategory::LiterallyHomeless
        );

        input.prior_living_situation = PriorLivingSituation::StayingWithFamily;
        input.losing_housing_within_fourteen_days = true;
        assert_eq!(
            classify_homeless_category(&input),
            HomelessCategory::ImminentRisk
        );

        input.losing_housing_within_fourteen_days = false;
        input.homeless_under_other_statute = true;
        assert_eq!(
            classify_homeless_category(&input),
            HomelessCategory::OtherStatuteHomeless
        );

        input.homeless_under_other_statute = false;
        assert_eq!(
            classify_homeless_category(&input),
            HomelessCategory::NotHomeless
        );
    }
}
