use serde::{Deserialize, Serialize};

use crate::workflows::codes::{LethalityLevel, RiskLevel};
use crate::workflows::intake::domain::SafetyScreeningPayload;

const HIGH_RANK: u8 = 3;
const MODERATE_RANK: u8 = 2;
const SEVERE_RANK: u8 = 4;

/// Aggregates the lethality screen with the client's current safety answers.
pub fn calculate_overall_risk_level(
    lethality: LethalityLevel,
    currently_safe: bool,
    has_safe_place: bool,
    needs_shelter: bool,
) -> RiskLevel {
    let mut rank = match lethality {
        LethalityLevel::NotScreened => None,
        LethalityLevel::Low => Some(1),
        LethalityLevel::Moderate => Some(MODERATE_RANK),
        LethalityLevel::High => Some(HIGH_RANK),
        LethalityLevel::Severe => Some(SEVERE_RANK),
    };

    if !currently_safe {
        rank = Some(rank.unwrap_or(0).max(HIGH_RANK));
    }

    if needs_shelter && !has_safe_place {
        rank = Some(match rank {
            Some(current) => (current + 1).min(SEVERE_RANK).max(MODERATE_RANK),
            None => MODERATE_RANK,
        });
    }

    match rank {
        None => RiskLevel::NotAssessed,
        Some(_)
            if lethality == LethalityLevel::Low
                && currently_safe
                && has_safe_place
                && !needs_shelter =>
        {
            RiskLevel::Minimal
        }
        Some(rank) => RiskLevel::from_rank(rank),
    }
}

/// Monotone OR; any single trigger recommends safety-plan routing.
pub fn should_auto_route_to_safety(
    risk: RiskLevel,
    currently_safe: bool,
    has_safe_place: bool,
    needs_shelter: bool,
) -> bool {
    matches!(risk, RiskLevel::High | RiskLevel::Severe)
        || !currently_safe
        || (needs_shelter && !has_safe_place)
}

/// Result of running the risk calculator over a safety screening.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub risk_level: RiskLevel,
    pub auto_route_to_safety: bool,
    pub factors: Vec<String>,
}

impl RiskAssessment {
    /// Unanswered questions do not escalate; the validator reports them separately.
    pub fn from_screening(screening: &SafetyScreeningPayload) -> Self {
        let currently_safe = screening.currently_safe.unwrap_or(true);
        let has_safe_place = screening.has_safe_place.unwrap_or(true);
        let needs_shelter = screening.needs_shelter.unwrap_or(false);

        let risk_level = calculate_overall_risk_level(
            screening.lethality_level,
            currently_safe,
            has_safe_place,
            needs_shelter,
        );
        let auto_route_to_safety =
            should_auto_route_to_safety(risk_level, currently_safe, has_safe_place, needs_shelter);

        let mut factors = Vec::new();
        if matches!(
            screening.lethality_level,
            LethalityLevel::High | LethalityLevel::Severe
        ) {
            factors.push(format!(
                "lethality screen {:?}",
                screening.lethality_level
            ));
        }
        if !currently_safe {
            factors.push("client reports not currently safe".to_string());
        }
        if needs_shelter && !has_safe_place {
            factors.push("needs shelter with no safe place to stay".to_string());
        }

        Self {
            risk_level,
            auto_route_to_safety,
            factors,
        }
    }
}
