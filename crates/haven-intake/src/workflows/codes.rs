//! HMIS code tables shared by the intake workflow and the PSDE record ledger.
//!
//! Every enum carries the federal integer code (`code`) alongside a display
//! label so exports and dropdowns can be produced from a single source.

use serde::{Deserialize, Serialize};

/// Five-point HMIS response used by most yes/no data elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HmisResponse {
    Yes,
    No,
    ClientDoesntKnow,
    ClientPrefersNotToAnswer,
    #[default]
    DataNotCollected,
}

impl HmisResponse {
    pub const fn code(self) -> u8 {
        match self {
            Self::No => 0,
            Self::Yes => 1,
            Self::ClientDoesntKnow => 8,
            Self::ClientPrefersNotToAnswer => 9,
            Self::DataNotCollected => 99,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Yes => "Yes",
            Self::No => "No",
            Self::ClientDoesntKnow => "Client doesn't know",
            Self::ClientPrefersNotToAnswer => "Client prefers not to answer",
            Self::DataNotCollected => "Data not collected",
        }
    }

    /// Yes or No; anything else counts against data quality.
    pub const fn is_known(self) -> bool {
        matches!(self, Self::Yes | Self::No)
    }

    pub const fn is_yes(self) -> bool {
        matches!(self, Self::Yes)
    }

    pub const fn is_collected(self) -> bool {
        !matches!(self, Self::DataNotCollected)
    }
}

/// HMIS 4.11.3, when the most recent domestic violence experience occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomesticViolenceRecency {
    WithinThreeMonths,
    ThreeToSixMonths,
    SixToTwelveMonths,
    MoreThanTwelveMonths,
    ClientDoesntKnow,
    ClientPrefersNotToAnswer,
    #[default]
    DataNotCollected,
}

impl DomesticViolenceRecency {
    pub const fn code(self) -> u8 {
        match self {
            Self::WithinThreeMonths => 1,
            Self::ThreeToSixMonths => 2,
            Self::SixToTwelveMonths => 3,
            Self::MoreThanTwelveMonths => 4,
            Self::ClientDoesntKnow => 8,
            Self::ClientPrefersNotToAnswer => 9,
            Self::DataNotCollected => 99,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::WithinThreeMonths => "Within the past three months",
            Self::ThreeToSixMonths => "Three to six months ago",
            Self::SixToTwelveMonths => "Six months to one year ago",
            Self::MoreThanTwelveMonths => "One year or more",
            Self::ClientDoesntKnow => "Client doesn't know",
            Self::ClientPrefersNotToAnswer => "Client prefers not to answer",
            Self::DataNotCollected => "Data not collected",
        }
    }

    pub const fn is_collected(self) -> bool {
        !matches!(self, Self::DataNotCollected)
    }

    pub const fn is_very_recent(self) -> bool {
        matches!(self, Self::WithinThreeMonths)
    }
}

/// HMIS 3.917 prior living situation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorLivingSituation {
    PlaceNotMeantForHabitation,
    EmergencyShelter,
    SafeHaven,
    TransitionalHousing,
    PsychiatricHospital,
    SubstanceUseTreatment,
    Hospital,
    JailOrPrison,
    FosterCare,
    LongTermCare,
    StayingWithFamily,
    StayingWithFriends,
    HotelMotelNoVoucher,
    RentalNoSubsidy,
    RentalWithSubsidy,
    OwnedByClient,
    PermanentHousingForFormerlyHomeless,
    RapidRehousing,
    ResidentialProject,
    Other,
    ClientDoesntKnow,
    ClientPrefersNotToAnswer,
    #[default]
    DataNotCollected,
}

impl PriorLivingSituation {
    pub const fn code(self) -> u16 {
        match self {
            Self::PlaceNotMeantForHabitation => 116,
            Self::EmergencyShelter => 101,
            Self::SafeHaven => 118,
            Self::TransitionalHousing => 215,
            Self::PsychiatricHospital => 204,
            Self::SubstanceUseTreatment => 205,
            Self::Hospital => 206,
            Self::JailOrPrison => 207,
            Self::FosterCare => 202,
            Self::LongTermCare => 225,
            Self::StayingWithFamily => 314,
            Self::StayingWithFriends => 313,
            Self::HotelMotelNoVoucher => 312,
            Self::RentalNoSubsidy => 411,
            Self::RentalWithSubsidy => 435,
            Self::OwnedByClient => 421,
            Self::PermanentHousingForFormerlyHomeless => 426,
            Self::RapidRehousing => 410,
            Self::ResidentialProject => 329,
            Self::Other => 17,
            Self::ClientDoesntKnow => 8,
            Self::ClientPrefersNotToAnswer => 9,
            Self::DataNotCollected => 99,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::PlaceNotMeantForHabitation => "Place not meant for habitation",
            Self::EmergencyShelter => "Emergency shelter",
            Self::SafeHaven => "Safe Haven",
            Self::TransitionalHousing => "Transitional housing for homeless persons",
            Self::PsychiatricHospital => "Psychiatric hospital or facility",
            Self::SubstanceUseTreatment => "Substance use treatment facility or detox center",
            Self::Hospital => "Hospital or other non-psychiatric medical facility",
            Self::JailOrPrison => "Jail, prison, or juvenile detention",
            Self::FosterCare => "Foster care home or group home",
            Self::LongTermCare => "Long-term care facility or nursing home",
            Self::StayingWithFamily => "Staying with family, temporary tenure",
            Self::StayingWithFriends => "Staying with friends, temporary tenure",
            Self::HotelMotelNoVoucher => "Hotel or motel paid without voucher",
            Self::RentalNoSubsidy => "Rental by client, no ongoing subsidy",
            Self::RentalWithSubsidy => "Rental by client, with ongoing subsidy",
            Self::OwnedByClient => "Owned by client",
            Self::PermanentHousingForFormerlyHomeless => {
                "Permanent housing for formerly homeless persons"
            }
            Self::RapidRehousing => "Rapid re-housing",
            Self::ResidentialProject => "Residential project or halfway house",
            Self::Other => "Other",
            Self::ClientDoesntKnow => "Client doesn't know",
            Self::ClientPrefersNotToAnswer => "Client prefers not to answer",
            Self::DataNotCollected => "Data not collected",
        }
    }

    pub const fn is_literally_homeless(self) -> bool {
        matches!(
            self,
            Self::PlaceNotMeantForHabitation
                | Self::EmergencyShelter
                | Self::SafeHaven
                | Self::TransitionalHousing
        )
    }

    pub const fn is_institutional(self) -> bool {
        matches!(
            self,
            Self::PsychiatricHospital
                | Self::SubstanceUseTreatment
                | Self::Hospital
                | Self::JailOrPrison
                | Self::FosterCare
                | Self::LongTermCare
        )
    }

    pub const fn is_temporary_housing(self) -> bool {
        matches!(
            self,
            Self::StayingWithFamily | Self::StayingWithFriends | Self::HotelMotelNoVoucher
        )
    }

    pub const fn is_permanent_housing(self) -> bool {
        matches!(
            self,
            Self::RentalNoSubsidy
                | Self::RentalWithSubsidy
                | Self::OwnedByClient
                | Self::PermanentHousingForFormerlyHomeless
                | Self::RapidRehousing
        )
    }

    pub const fn is_known(self) -> bool {
        !matches!(
            self,
            Self::ClientDoesntKnow | Self::ClientPrefersNotToAnswer | Self::DataNotCollected
        )
    }
}

/// HMIS 3.917 length of stay in the prior living situation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LengthOfStay {
    OneNightOrLess,
    TwoToSixNights,
    OneWeekToOneMonth,
    OneToThreeMonths,
    ThreeMonthsToOneYear,
    OneYearOrLonger,
    ClientDoesntKnow,
    ClientPrefersNotToAnswer,
    #[default]
    DataNotCollected,
}

impl LengthOfStay {
    pub const fn code(self) -> u8 {
        match self {
            Self::OneNightOrLess => 10,
            Self::TwoToSixNights => 11,
            Self::OneWeekToOneMonth => 2,
            Self::OneToThreeMonths => 3,
            Self::ThreeMonthsToOneYear => 4,
            Self::OneYearOrLonger => 5,
            Self::ClientDoesntKnow => 8,
            Self::ClientPrefersNotToAnswer => 9,
            Self::DataNotCollected => 99,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::OneNightOrLess => "One night or less",
            Self::TwoToSixNights => "Two to six nights",
            Self::OneWeekToOneMonth => "One week or more, but less than one month",
            Self::OneToThreeMonths => "One month or more, but less than 90 days",
            Self::ThreeMonthsToOneYear => "90 days or more, but less than one year",
            Self::OneYearOrLonger => "One year or longer",
            Self::ClientDoesntKnow => "Client doesn't know",
            Self::ClientPrefersNotToAnswer => "Client prefers not to answer",
            Self::DataNotCollected => "Data not collected",
        }
    }
}

/// HMIS 4.02 income sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncomeSource {
    Earned,
    Unemployment,
    Ssi,
    Ssdi,
    VaDisability,
    PrivateDisability,
    WorkersCompensation,
    Tanf,
    GeneralAssistance,
    RetirementSocialSecurity,
    Pension,
    ChildSupport,
    Alimony,
    Other,
}

impl IncomeSource {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Earned => "Earned income",
            Self::Unemployment => "Unemployment insurance",
            Self::Ssi => "Supplemental Security Income",
            Self::Ssdi => "Social Security Disability Insurance",
            Self::VaDisability => "VA service-connected disability compensation",
            Self::PrivateDisability => "Private disability insurance",
            Self::WorkersCompensation => "Worker's compensation",
            Self::Tanf => "TANF",
            Self::GeneralAssistance => "General assistance",
            Self::RetirementSocialSecurity => "Retirement income from Social Security",
            Self::Pension => "Pension or retirement income",
            Self::ChildSupport => "Child support",
            Self::Alimony => "Alimony or spousal support",
            Self::Other => "Other source",
        }
    }
}

/// HMIS 4.03 non-cash benefits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NonCashBenefit {
    Snap,
    Wic,
    TanfChildCare,
    TanfTransportation,
    OtherTanf,
    Other,
}

/// Federal homeless definition categories (24 CFR 578.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HomelessCategory {
    LiterallyHomeless,
    ImminentRisk,
    OtherStatuteHomeless,
    FleeingDomesticViolence,
    NotHomeless,
}

impl HomelessCategory {
    pub const fn code(self) -> u8 {
        match self {
            Self::LiterallyHomeless => 1,
            Self::ImminentRisk => 2,
            Self::OtherStatuteHomeless => 3,
            Self::FleeingDomesticViolence => 4,
            Self::NotHomeless => 0,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::LiterallyHomeless => "Category 1: Literally Homeless",
            Self::ImminentRisk => "Category 2: Imminent Risk of Homelessness",
            Self::OtherStatuteHomeless => "Category 3: Homeless Under Other Federal Statutes",
            Self::FleeingDomesticViolence => "Category 4: Fleeing Domestic Violence",
            Self::NotHomeless => "Not Homeless",
        }
    }

    /// Categories that qualify for CoC-funded TH, RRH, and PSH.
    pub const fn qualifies_for_housing_programs(self) -> bool {
        matches!(self, Self::LiterallyHomeless | Self::FleeingDomesticViolence)
    }

    pub const fn is_homeless(self) -> bool {
        !matches!(self, Self::NotHomeless)
    }
}

/// Graded VAWA redaction policy attached to a sensitive record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DvRedactionLevel {
    #[default]
    NoRedaction,
    RedactForGeneralStaff,
    RedactForNonDvSpecialists,
    FullRedactionRequired,
    VictimRequestedConfidentiality,
}

impl DvRedactionLevel {
    pub const fn label(self) -> &'static str {
        match self {
            Self::NoRedaction => "No redaction",
            Self::RedactForGeneralStaff => "Redact for general staff",
            Self::RedactForNonDvSpecialists => "Redact for non-DV specialists",
            Self::FullRedactionRequired => "Full redaction required",
            Self::VictimRequestedConfidentiality => "Victim requested confidentiality",
        }
    }

    /// Levels strong enough to honor a VAWA confidentiality request.
    pub const fn honors_vawa_request(self) -> bool {
        matches!(
            self,
            Self::FullRedactionRequired | Self::VictimRequestedConfidentiality
        )
    }
}

/// Housing program families a client can be matched to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgramType {
    TransitionalHousing,
    RapidRehousing,
    PermanentSupportiveHousing,
    EmergencyShelter,
    HomelessnessPrevention,
    DvServices,
}

impl ProgramType {
    pub const fn label(self) -> &'static str {
        match self {
            Self::TransitionalHousing => "Transitional Housing",
            Self::RapidRehousing => "Rapid Re-Housing",
            Self::PermanentSupportiveHousing => "Permanent Supportive Housing",
            Self::EmergencyShelter => "Emergency Shelter",
            Self::HomelessnessPrevention => "Homelessness Prevention",
            Self::DvServices => "Domestic Violence Services",
        }
    }
}

/// Lethality screening outcome recorded by the advocate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LethalityLevel {
    #[default]
    NotScreened,
    Low,
    Moderate,
    High,
    Severe,
}

/// Aggregate risk. `NotAssessed` is a "no data" sentinel and has no rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Minimal,
    Low,
    Moderate,
    High,
    Severe,
    #[default]
    NotAssessed,
}

impl RiskLevel {
    /// Position on the ordinal scale; `None` for `NotAssessed`.
    pub const fn rank(self) -> Option<u8> {
        match self {
            Self::Minimal => Some(0),
            Self::Low => Some(1),
            Self::Moderate => Some(2),
            Self::High => Some(3),
            Self::Severe => Some(4),
            Self::NotAssessed => None,
        }
    }

    pub const fn from_rank(rank: u8) -> Self {
        match rank {
            0 => Self::Minimal,
            1 => Self::Low,
            2 => Self::Moderate,
            3 => Self::High,
            _ => Self::Severe,
        }
    }

    /// Ordinal comparison that is always false when either side is unassessed.
    pub fn is_at_least(self, other: RiskLevel) -> bool {
        match (self.rank(), other.rank()) {
            (Some(lhs), Some(rhs)) => lhs >= rhs,
            _ => false,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Minimal => "Minimal",
            Self::Low => "Low",
            Self::Moderate => "Moderate",
            Self::High => "High",
            Self::Severe => "Severe",
            Self::NotAssessed => "Not Assessed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_assessed_never_compares() {
        assert!(!RiskLevel::NotAssessed.is_at_least(RiskLevel::Minimal));
        assert!(!RiskLevel::Severe.is_at_least(RiskLevel::NotAssessed));
        assert!(RiskLevel::High.is_at_least(RiskLevel::Moderate));
        assert!(!RiskLevel::Low.is_at_least(RiskLevel::Moderate));
    }

    #[test]
    fn literally_homeless_situations_match_hud_definition() {
        assert!(PriorLivingSituation::EmergencyShelter.is_literally_homeless());
        assert!(PriorLivingSituation::PlaceNotMeantForHabitation.is_literally_homeless());
        assert!(!PriorLivingSituation::StayingWithFamily.is_literally_homeless());
        assert!(PriorLivingSituation::StayingWithFamily.is_temporary_housing());
        assert!(PriorLivingSituation::JailOrPrison.is_institutional());
    }

    #[test]
    fn only_strong_levels_honor_vawa_requests() {
        assert!(DvRedactionLevel::VictimRequestedConfidentiality.honors_vawa_request());
        assert!(!DvRedactionLevel::RedactForGeneralStaff.honors_vawa_request());
    }
}
