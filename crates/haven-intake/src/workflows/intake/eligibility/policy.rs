use serde::{Deserialize, Serialize};

use crate::workflows::codes::{HmisResponse, HomelessCategory, ProgramType};

use super::rules::{CHRONIC_EPISODES_THRESHOLD, CHRONIC_MONTHS_THRESHOLD};

/// Disqualifying factor reported alongside an eligibility result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum IneligibilityReason {
    HomelessCategory {
        program: ProgramType,
        category: HomelessCategory,
    },
    IncomeAboveLimit {
        program: ProgramType,
        annual_income: u64,
        limit: u64,
    },
    NotChronicallyHomeless {
        months: u16,
        episodes: u16,
    },
    NoDisablingCondition {
        response: HmisResponse,
    },
}

impl IneligibilityReason {
    pub fn program(&self) -> ProgramType {
        match self {
            IneligibilityReason::HomelessCategory { program, .. }
            | IneligibilityReason::IncomeAboveLimit { program, .. } => *program,
            IneligibilityReason::NotChronicallyHomeless { .. }
            | IneligibilityReason::NoDisablingCondition { .. } => {
                ProgramType::PermanentSupportiveHousing
            }
        }
    }

    pub fn summary(&self) -> String {
        match self {
            IneligibilityReason::HomelessCategory { program, category } => format!(
                "{} requires Category 1 or Category 4 homelessness (client is {})",
                program.label(),
                category.label()
            ),
            IneligibilityReason::IncomeAboveLimit {
                program,
                annual_income,
                limit,
            } => format!(
                "{} income limit exceeded (annual income ${annual_income}, limit ${limit})",
                program.label()
            ),
            IneligibilityReason::NotChronicallyHomeless { months, episodes } => format!(
                "not chronically homeless ({months} months and {episodes} episodes in the past 3 years; needs {CHRONIC_MONTHS_THRESHOLD} months or {CHRONIC_EPISODES_THRESHOLD} episodes)"
            ),
            IneligibilityReason::NoDisablingCondition { response } => format!(
                "Permanent Supportive Housing requires a disabling condition (answer: {})",
                response.label()
            ),
        }
    }
}

/// PSH > RRH > TH > first other program.
pub(crate) fn recommend(
    transitional: bool,
    rapid_rehousing: bool,
    permanent_supportive: bool,
    other: &[ProgramType],
    category: HomelessCategory,
) -> (Option<ProgramType>, String) {
    if permanent_supportive {
        return (
            Some(ProgramType::PermanentSupportiveHousing),
            "chronically homeless with a disabling condition; PSH is the best fit".to_string(),
        );
    }
    if rapid_rehousing {
        return (
            Some(ProgramType::RapidRehousing),
            format!(
                "{} and within the RRH income limit",
                category.label()
            ),
        );
    }
    if transitional {
        return (
            Some(ProgramType::TransitionalHousing),
            format!("{}; income exceeds the RRH limit", category.label()),
        );
    }
    if let Some(first) = other.first() {
        return (
            Some(*first),
            format!(
                "not eligible for CoC housing programs; {} is available",
                first.label()
            ),
        );
    }
    (
        None,
        "no eligible program; refer to community resources".to_string(),
    )
}
