use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::workflows::codes::{
    DomesticViolenceRecency, DvRedactionLevel, HmisResponse, IncomeSource, LengthOfStay,
    LethalityLevel, NonCashBenefit, PriorLivingSituation, ProgramType,
};

/// Identifier wrapper for an intake attempt.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IntakeId(pub String);

impl fmt::Display for IntakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The ten fixed intake stages, in collection order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntakeStage {
    InitialContact,
    SafetyScreening,
    Consent,
    Identity,
    HousingHistory,
    Household,
    Income,
    HealthAndDomesticViolence,
    ProgramSelection,
    ServicePlan,
}

impl IntakeStage {
    pub const COUNT: usize = 10;

    pub const fn ordered() -> [Self; Self::COUNT] {
        [
            Self::InitialContact,
            Self::SafetyScreening,
            Self::Consent,
            Self::Identity,
            Self::HousingHistory,
            Self::Household,
            Self::Income,
            Self::HealthAndDomesticViolence,
            Self::ProgramSelection,
            Self::ServicePlan,
        ]
    }

    /// One-based stage number as shown to staff.
    pub const fn number(self) -> u8 {
        match self {
            Self::InitialContact => 1,
            Self::SafetyScreening => 2,
            Self::Consent => 3,
            Self::Identity => 4,
            Self::HousingHistory => 5,
            Self::Household => 6,
            Self::Income => 7,
            Self::HealthAndDomesticViolence => 8,
            Self::ProgramSelection => 9,
            Self::ServicePlan => 10,
        }
    }

    pub fn from_number(number: u8) -> Option<Self> {
        Self::ordered()
            .into_iter()
            .find(|stage| stage.number() == number)
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::InitialContact => "Initial Contact",
            Self::SafetyScreening => "Safety & Lethality Screening",
            Self::Consent => "Consent",
            Self::Identity => "Identity & Demographics",
            Self::HousingHistory => "Housing History",
            Self::Household => "Household Composition",
            Self::Income => "Income & Benefits",
            Self::HealthAndDomesticViolence => "Health, Disability & Domestic Violence",
            Self::ProgramSelection => "Eligibility & Program Selection",
            Self::ServicePlan => "Documents & Service Plan",
        }
    }
}

impl fmt::Display for IntakeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stage {} ({})", self.number(), self.label())
    }
}

/// Per-stage completion state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    #[default]
    NotStarted,
    InProgress,
    Complete,
}

impl StageStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::NotStarted => "Not Started",
            Self::InProgress => "In Progress",
            Self::Complete => "Complete",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactMethod {
    Phone,
    Text,
    Email,
    InPerson,
    DoNotContact,
}

/// Stage 1. Collected before consent, so only an alias is stored.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InitialContactPayload {
    pub client_alias: Option<String>,
    pub contact_date: Option<NaiveDate>,
    pub referral_source: Option<String>,
    pub safe_contact_method: Option<ContactMethod>,
    pub safe_phone: Option<String>,
    pub okay_to_leave_message: Option<bool>,
}

/// Stage 2. Lethality screening answers feeding the risk calculator.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SafetyScreeningPayload {
    pub screening_date: Option<NaiveDate>,
    pub lethality_level: LethalityLevel,
    pub currently_safe: Option<bool>,
    pub has_safe_place: Option<bool>,
    pub needs_shelter: Option<bool>,
    pub safety_plan_started: bool,
}

/// Stage 3. Consent to services gates everything that follows.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConsentPayload {
    pub consent_to_services: Option<bool>,
    pub consent_to_data_sharing: Option<bool>,
    pub hmis_participation: Option<bool>,
    pub consent_date: Option<NaiveDate>,
    pub vawa_confidentiality_requested: bool,
    pub dv_redaction_level: DvRedactionLevel,
}

/// Stage 4.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IdentityPayload {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub anonymous: bool,
    pub date_of_birth: Option<NaiveDate>,
    pub ssn: Option<String>,
    pub gender: Option<String>,
    pub race_ethnicity: Vec<String>,
    pub veteran_status: HmisResponse,
}

/// Stage 5.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HousingHistoryPayload {
    pub prior_living_situation: PriorLivingSituation,
    pub length_of_stay: LengthOfStay,
    pub project_entry_date: Option<NaiveDate>,
    pub homelessness_start_date: Option<NaiveDate>,
    pub times_homeless_past_three_years: Option<u16>,
    pub months_homeless_past_three_years: Option<u16>,
    pub fleeing_domestic_violence: bool,
    pub losing_housing_within_fourteen_days: bool,
    pub homeless_under_other_statute: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HouseholdMember {
    pub alias: String,
    pub relationship: String,
    pub is_adult: bool,
    pub date_of_birth: Option<NaiveDate>,
}

/// Stage 6. `total_size` is derived from adults and children.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HouseholdPayload {
    pub adults: u8,
    pub children: u8,
    pub total_size: u8,
    pub members: Vec<HouseholdMember>,
}

impl HouseholdPayload {
    pub fn new(adults: u8, children: u8) -> Self {
        Self {
            adults,
            children,
            total_size: adults.saturating_add(children),
            members: Vec::new(),
        }
    }

    pub fn expected_total(&self) -> u16 {
        u16::from(self.adults) + u16::from(self.children)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomeEntry {
    pub source: IncomeSource,
    pub monthly_amount: u32,
}

/// Stage 7. Amounts are whole dollars per month.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IncomePayload {
    pub information_date: Option<NaiveDate>,
    pub income_from_any_source: HmisResponse,
    pub total_monthly_income: Option<u32>,
    pub sources: Vec<IncomeEntry>,
    pub non_cash_benefits: Vec<NonCashBenefit>,
    pub covered_by_health_insurance: HmisResponse,
}

/// Stage 8. Program-specific data elements, including the DV disclosure.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HealthAndDvPayload {
    pub information_date: Option<NaiveDate>,
    pub disabling_condition: HmisResponse,
    pub physical_disability: HmisResponse,
    pub developmental_disability: HmisResponse,
    pub chronic_health_condition: HmisResponse,
    pub hiv_aids: HmisResponse,
    pub mental_health_disorder: HmisResponse,
    pub substance_use_disorder: HmisResponse,
    pub domestic_violence: HmisResponse,
    pub domestic_violence_recency: DomesticViolenceRecency,
    pub currently_fleeing: HmisResponse,
}

impl HealthAndDvPayload {
    /// Clears the DV follow-up answers when no history was disclosed.
    pub fn normalized(mut self) -> Self {
        if !self.domestic_violence.is_yes() {
            self.domestic_violence_recency = DomesticViolenceRecency::DataNotCollected;
            self.currently_fleeing = HmisResponse::DataNotCollected;
        }
        self
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
}

/// Stage 9.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProgramSelectionPayload {
    pub selected_program: Option<ProgramType>,
    pub override_justification: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentCategory {
    Identification,
    IncomeVerification,
    HomelessVerification,
    DisabilityVerification,
    ProtectiveOrder,
    Misc,
}

/// Metadata only; file storage is owned by the document service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentEntry {
    pub name: String,
    pub category: Option<DocumentCategory>,
    pub storage_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceGoal {
    pub description: String,
    pub target_date: Option<NaiveDate>,
}

/// Stage 10 (optional).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ServicePlanPayload {
    pub documents: Vec<DocumentEntry>,
    pub goals: Vec<ServiceGoal>,
}

/// Stage payload; the variant determines which validator applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StagePayload {
    InitialContact(InitialContactPayload),
    SafetyScreening(SafetyScreeningPayload),
    Consent(ConsentPayload),
    Identity(IdentityPayload),
    HousingHistory(HousingHistoryPayload),
    Household(HouseholdPayload),
    Income(IncomePayload),
    HealthAndDomesticViolence(HealthAndDvPayload),
    ProgramSelection(ProgramSelectionPayload),
    ServicePlan(ServicePlanPayload),
}

impl StagePayload {
    pub const fn stage(&self) -> IntakeStage {
        match self {
            Self::InitialContact(_) => IntakeStage::InitialContact,
            Self::SafetyScreening(_) => IntakeStage::SafetyScreening,
            Self::Consent(_) => IntakeStage::Consent,
            Self::Identity(_) => IntakeStage::Identity,
            Self::HousingHistory(_) => IntakeStage::HousingHistory,
            Self::Household(_) => IntakeStage::Household,
            Self::Income(_) => IntakeStage::Income,
            Self::HealthAndDomesticViolence(_) => IntakeStage::HealthAndDomesticViolence,
            Self::ProgramSelection(_) => IntakeStage::ProgramSelection,
            Self::ServicePlan(_) => IntakeStage::ServicePlan,
        }
    }

    /// Empty payload for a stage, used when staff open a stage for the first time.
    pub fn empty_for(stage: IntakeStage) -> Self {
        match stage {
            IntakeStage::InitialContact => Self::InitialContact(Default::default()),
            IntakeStage::SafetyScreening => Self::SafetyScreening(Default::default()),
            IntakeStage::Consent => Self::Consent(Default::default()),
            IntakeStage::Identity => Self::Identity(Default::default()),
            IntakeStage::HousingHistory => Self::HousingHistory(Default::default()),
            IntakeStage::Household => Self::Household(Default::default()),
            IntakeStage::Income => Self::Income(Default::default()),
            IntakeStage::HealthAndDomesticViolence => {
                Self::HealthAndDomesticViolence(Default::default())
            }
            IntakeStage::ProgramSelection => Self::ProgramSelection(Default::default()),
            IntakeStage::ServicePlan => Self::ServicePlan(Default::default()),
        }
    }

    /// Applies derived-field rules before the payload is stored.
    pub fn normalized(self) -> Self {
        match self {
            Self::Household(mut household) => {
                household.total_size = household.adults.saturating_add(household.children);
                Self::Household(household)
            }
            Self::HealthAndDomesticViolence(health) => {
                Self::HealthAndDomesticViolence(health.normalized())
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_numbers_round_trip() {
        for stage in IntakeStage::ordered() {
            assert_eq!(IntakeStage::from_number(stage.number()), Some(stage));
        }
        assert_eq!(IntakeStage::from_number(0), None);
        assert_eq!(IntakeStage::from_number(11), None);
    }

    #[test]
    fn household_total_is_derived() {
        let household = HouseholdPayload::new(2, 1);
        assert_eq!(household.total_size, 3);

        let mut tampered = household.clone();
        tampered.total_size = 4;
        match StagePayload::Household(tampered).normalized() {
            StagePayload::Household(normalized) => assert_eq!(normalized.total_size, 3),
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn normalizing_clears_dv_follow_ups_without_history() {
        let payload = HealthAndDvPayload {
            domestic_violence: HmisResponse::No,
            domestic_violence_recency: DomesticViolenceRecency::WithinThreeMonths,
            currently_fleeing: HmisResponse::Yes,
            ..Default::default()
        }
        .normalized();

        assert_eq!(
            payload.domestic_violence_recency,
            DomesticViolenceRecency::DataNotCollected
        );
        assert_eq!(payload.currently_fleeing, HmisResponse::DataNotCollected);
    }
}
