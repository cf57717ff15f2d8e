use serde::{Deserialize, Serialize};

use super::domain::{LifecycleStatus, SensitiveRecord};
use crate::workflows::codes::{DvRedactionLevel, HmisResponse};

const DATA_QUALITY_POINTS: u32 = 30;
const VAWA_POINTS: u32 = 25;
const PARTIAL_VAWA_POINTS: u32 = 15;
const COMPLETENESS_POINTS: u32 = 25;
const LIFECYCLE_POINTS: u32 = 20;

/// Weighted 0-100 compliance score for a single version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceScore {
    pub data_quality: u32,
    pub vawa_compliance: u32,
    pub completeness: u32,
    pub lifecycle: u32,
    pub total: u32,
}

impl ComplianceScore {
    pub fn percent(&self) -> f64 {
        f64::from(self.total)
    }
}

pub fn calculate_compliance_score(record: &SensitiveRecord) -> ComplianceScore {
    let data_quality = data_quality(record);
    let vawa_compliance = vawa_compliance(record);
    let completeness = completeness(record);
    let lifecycle = match record.lifecycle_status {
        LifecycleStatus::Active => LIFECYCLE_POINTS,
        LifecycleStatus::PendingApproval => LIFECYCLE_POINTS / 2,
        _ => 0,
    };

    ComplianceScore {
        data_quality,
        vawa_compliance,
        completeness,
        lifecycle,
        total: data_quality + vawa_compliance + completeness + lifecycle,
    }
}

fn proportion(points: u32, hits: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    points * hits as u32 / total as u32
}

fn data_quality(record: &SensitiveRecord) -> u32 {
    let payload = &record.payload;
    let mut responses: Vec<HmisResponse> = vec![
        payload.income_from_any_source,
        payload.covered_by_health_insurance,
        payload.domestic_violence,
    ];
    responses.extend(payload.disability_responses().map(|(_, response)| response));
    if payload.domestic_violence.is_yes() {
        responses.push(payload.currently_fleeing);
    }

    let known = responses.iter().filter(|response| response.is_known()).count();
    proportion(DATA_QUALITY_POINTS, known, responses.len())
}

fn vawa_compliance(record: &SensitiveRecord) -> u32 {
    let payload = &record.payload;
    if !payload.domestic_violence.is_collected() {
        return 0;
    }
    let needs_protection =
        payload.vawa_confidentiality_requested || payload.is_high_sensitivity_dv_case();
    match payload.dv_redaction_level {
        DvRedactionLevel::NoRedaction if needs_protection => 0,
        level if payload.vawa_confidentiality_requested && !level.honors_vawa_request() => {
            PARTIAL_VAWA_POINTS
        }
        _ => VAWA_POINTS,
    }
}

fn completeness(record: &SensitiveRecord) -> u32 {
    let payload = &record.payload;
    let mut populated = vec![
        payload.information_date.is_some(),
        !payload.collected_by.trim().is_empty(),
        payload.income_from_any_source.is_collected(),
        payload.total_monthly_income.is_some(),
        payload.covered_by_health_insurance.is_collected(),
        payload.domestic_violence.is_collected(),
    ];
    populated.extend(
        payload
            .disability_responses()
            .map(|(_, response)| response.is_collected()),
    );
    if payload.domestic_violence.is_yes() {
        populated.push(payload.domestic_violence_recency.is_collected());
        populated.push(payload.currently_fleeing.is_collected());
    }

    let hits = populated.iter().filter(|present| **present).count();
    proportion(COMPLETENESS_POINTS, hits, populated.len())
}
