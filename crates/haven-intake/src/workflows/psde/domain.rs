use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::workflows::codes::{DomesticViolenceRecency, DvRedactionLevel, HmisResponse};
use crate::workflows::intake::domain::{IntakeStage, StagePayload};
use crate::workflows::intake::workflow::WorkflowRecord;

/// Identifier of a single immutable version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(pub Uuid);

impl RecordId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier shared by every version of one logical record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FamilyId(pub Uuid);

impl FamilyId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for FamilyId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FamilyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleStatus {
    Active,
    /// A correction awaiting supervisor sign-off; it is the family's current version.
    PendingApproval,
    Superseded,
    Corrected,
    Deleted,
}

impl LifecycleStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::PendingApproval => "PENDING_APPROVAL",
            Self::Superseded => "SUPERSEDED",
            Self::Corrected => "CORRECTED",
            Self::Deleted => "DELETED",
        }
    }

    /// True for the one version per family that later operations act on.
    pub const fn is_current(self) -> bool {
        matches!(self, Self::Active | Self::PendingApproval)
    }
}

impl fmt::Display for LifecycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CorrectionReason {
    DataEntryError,
    ClientCorrection,
    SystemError,
    PolicyChange,
    AuditFinding,
    SupervisorReview,
}

impl CorrectionReason {
    pub const fn code(self) -> &'static str {
        match self {
            Self::DataEntryError => "DATA_ENTRY",
            Self::ClientCorrection => "CLIENT_CORRECTION",
            Self::SystemError => "SYSTEM_ERROR",
            Self::PolicyChange => "POLICY_CHANGE",
            Self::AuditFinding => "AUDIT",
            Self::SupervisorReview => "SUPERVISOR",
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::DataEntryError => "Correction of data entry error",
            Self::ClientCorrection => "Client provided corrected information",
            Self::SystemError => "System or technical error correction",
            Self::PolicyChange => "Correction due to policy interpretation change",
            Self::AuditFinding => "Correction based on audit finding",
            Self::SupervisorReview => "Correction following supervisor review",
        }
    }

    /// Reasons that reinterpret data rather than fix an entry need sign-off.
    pub const fn requires_supervisor_approval(self) -> bool {
        matches!(self, Self::PolicyChange | Self::AuditFinding)
    }
}

/// HMIS data collection point the payload was gathered at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionStage {
    #[default]
    InitialIntake,
    ComprehensiveAssessment,
    Update,
    AnnualAssessment,
    ProjectExit,
}

impl CollectionStage {
    /// Stages where unknown responses count as errors rather than warnings.
    pub const fn requires_full_data_quality(self) -> bool {
        matches!(
            self,
            Self::ComprehensiveAssessment | Self::AnnualAssessment | Self::ProjectExit
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveInType {
    RapidRehousing,
    PermanentSupportiveHousing,
    OtherPermanentHousing,
    #[default]
    DataNotCollected,
}

/// Program-specific data elements: income, health, disability, and DV disclosure.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PsdePayload {
    pub information_date: Option<NaiveDate>,
    pub collection_stage: CollectionStage,
    pub collected_by: String,
    pub income_from_any_source: HmisResponse,
    pub total_monthly_income: Option<u32>,
    pub covered_by_health_insurance: HmisResponse,
    pub physical_disability: HmisResponse,
    pub developmental_disability: HmisResponse,
    pub chronic_health_condition: HmisResponse,
    pub hiv_aids: HmisResponse,
    pub mental_health_disorder: HmisResponse,
    pub substance_use_disorder: HmisResponse,
    pub domestic_violence: HmisResponse,
    pub domestic_violence_recency: DomesticViolenceRecency,
    pub currently_fleeing: HmisResponse,
    pub dv_redaction_level: DvRedactionLevel,
    pub vawa_confidentiality_requested: bool,
    pub residential_move_in_date: Option<NaiveDate>,
    pub move_in_type: MoveInType,
}

impl PsdePayload {
    /// Fleeing now, abuse within three months, or a VAWA confidentiality request.
    pub fn is_high_sensitivity_dv_case(&self) -> bool {
        self.currently_fleeing.is_yes()
            || self.domestic_violence_recency.is_very_recent()
            || self.vawa_confidentiality_requested
    }

    pub fn requires_dv_redaction(&self) -> bool {
        self.dv_redaction_level != DvRedactionLevel::NoRedaction
            || self.vawa_confidentiality_requested
            || self.domestic_violence.is_yes()
    }

    pub fn disability_responses(&self) -> [(&'static str, HmisResponse); 6] {
        [
            ("physicalDisability", self.physical_disability),
            ("developmentalDisability", self.developmental_disability),
            ("chronicHealthCondition", self.chronic_health_condition),
            ("hivAids", self.hiv_aids),
            ("mentalHealthDisorder", self.mental_health_disorder),
            ("substanceUseDisorder", self.substance_use_disorder),
        ]
    }

    /// Builds the payload from a completed intake's consent, income, and health stages.
    pub fn from_intake(record: &WorkflowRecord, collected_by: impl Into<String>) -> Option<Self> {
        let Some(StagePayload::HealthAndDomesticViolence(health)) =
            record.payload(IntakeStage::HealthAndDomesticViolence)
        else {
            return None;
        };

        let mut payload = Self {
            information_date: health.information_date,
            collection_stage: CollectionStage::InitialIntake,
            collected_by: collected_by.into(),
            physical_disability: health.physical_disability,
            developmental_disability: health.developmental_disability,
            chronic_health_condition: health.chronic_health_condition,
            hiv_aids: health.hiv_aids,
            mental_health_disorder: health.mental_health_disorder,
            substance_use_disorder: health.substance_use_disorder,
            domestic_violence: health.domestic_violence,
            domestic_violence_recency: health.domestic_violence_recency,
            currently_fleeing: health.currently_fleeing,
            ..Self::default()
        };

        if let Some(StagePayload::Income(income)) = record.payload(IntakeStage::Income) {
            payload.income_from_any_source = income.income_from_any_source;
            payload.total_monthly_income = income.total_monthly_income;
            payload.covered_by_health_insurance = income.covered_by_health_insurance;
        }
        if let Some(consent) = record.consent() {
            payload.dv_redaction_level = consent.dv_redaction_level;
            payload.vawa_confidentiality_requested = consent.vawa_confidentiality_requested;
        }

        Some(payload)
    }
}

/// Case-specific seal; while present only the sealing actor and override roles see the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seal {
    pub sealed_by: String,
    pub sealed_at: DateTime<Utc>,
    pub reason: String,
}

/// One immutable version within a record family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensitiveRecord {
    pub record_id: RecordId,
    pub family_id: FamilyId,
    pub version: u32,
    pub lifecycle_status: LifecycleStatus,
    pub payload: PsdePayload,
    pub is_high_sensitivity_dv_case: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correction_of: Option<RecordId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supersedes: Option<RecordId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correction_reason: Option<CorrectionReason>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub effective_start: DateTime<Utc>,
    #[serde(default)]
    pub effective_end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status_changed_by: Option<String>,
    #[serde(default)]
    pub status_changed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_backdated: bool,
    #[serde(default)]
    pub backdating_reason: Option<String>,
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

impl SensitiveRecord {
    pub(crate) fn first(
        family_id: FamilyId,
        payload: PsdePayload,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            record_id: RecordId::new(),
            family_id,
            version: 1,
            lifecycle_status: LifecycleStatus::Active,
            is_high_sensitivity_dv_case: payload.is_high_sensitivity_dv_case(),
            payload,
            correction_of: None,
            supersedes: None,
            correction_reason: None,
            created_by: actor.to_string(),
            created_at: now,
            effective_start: now,
            effective_end: None,
            status_changed_by: None,
            status_changed_at: None,
            is_backdated: false,
            backdating_reason: None,
            idempotency_key: None,
        }
    }

    /// Next version in the same family, starting from a copy of this one.
    pub(crate) fn successor(&self, payload: PsdePayload, actor: &str, now: DateTime<Utc>) -> Self {
        Self {
            record_id: RecordId::new(),
            version: self.version + 1,
            is_high_sensitivity_dv_case: payload.is_high_sensitivity_dv_case(),
            payload,
            supersedes: Some(self.record_id),
            ..Self::first(self.family_id, PsdePayload::default(), actor, now)
        }
    }

    pub fn dv_redaction_level(&self) -> DvRedactionLevel {
        self.payload.dv_redaction_level
    }

    pub fn vawa_confidentiality_requested(&self) -> bool {
        self.payload.vawa_confidentiality_requested
    }

    pub fn is_correction(&self) -> bool {
        self.correction_of.is_some()
    }
}
