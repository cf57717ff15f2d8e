use std::collections::BTreeMap;
use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::workflows::codes::ProgramType;

const DEFAULT_RRH_AMI_PERCENT: u8 = 50;
const DEFAULT_PREVENTION_AMI_PERCENT: u8 = 30;
/// HUD adds 8% of the four-person limit for each member beyond eight.
const EXTRA_MEMBER_INCREMENT_PERCENT: u32 = 8;

/// Jurisdiction-specific inputs to the eligibility calculator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibilityConfig {
    pub area_median_income: AreaMedianIncome,
    pub rrh_ami_percent: u8,
    pub prevention_ami_percent: u8,
    pub program_ids: BTreeMap<ProgramType, String>,
}

impl EligibilityConfig {
    pub fn with_area_median_income(mut self, table: AreaMedianIncome) -> Self {
        self.area_median_income = table;
        self
    }

    pub fn program_id(&self, program: ProgramType) -> Option<&str> {
        self.program_ids.get(&program).map(String::as_str)
    }

    /// Annual income ceiling for `household_size` at `percent` of AMI.
    pub fn income_limit(&self, household_size: u8, percent: u8) -> u64 {
        let median = u64::from(self.area_median_income.annual_limit(household_size));
        median * u64::from(percent) / 100
    }
}

impl Default for EligibilityConfig {
    fn default() -> Self {
        let program_ids = [
            (ProgramType::TransitionalHousing, "th-dv-001"),
            (ProgramType::RapidRehousing, "rrh-coc-001"),
            (ProgramType::PermanentSupportiveHousing, "psh-coc-001"),
            (ProgramType::EmergencyShelter, "es-dv-001"),
            (ProgramType::HomelessnessPrevention, "hp-esg-001"),
            (ProgramType::DvServices, "dv-svc-001"),
        ]
        .into_iter()
        .map(|(program, id)| (program, id.to_string()))
        .collect();

        Self {
            area_median_income: AreaMedianIncome::default(),
            rrh_ami_percent: DEFAULT_RRH_AMI_PERCENT,
            prevention_ami_percent: DEFAULT_PREVENTION_AMI_PERCENT,
            program_ids,
        }
    }
}

/// 100% area median income by household size, in annual dollars.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaMedianIncome {
    limits: BTreeMap<u8, u32>,
}

impl AreaMedianIncome {
    pub fn new(limits: BTreeMap<u8, u32>) -> Result<Self, AmiTableError> {
        if limits.is_empty() {
            return Err(AmiTableError::Empty);
        }
        if limits.contains_key(&0) {
            return Err(AmiTableError::InvalidHouseholdSize(0));
        }
        Ok(Self { limits })
    }

    /// Parse a `household_size,annual_median_income` CSV export.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, AmiTableError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut limits = BTreeMap::new();
        for row in csv_reader.deserialize::<AmiRow>() {
            let row = row?;
            if row.household_size == 0 {
                return Err(AmiTableError::InvalidHouseholdSize(row.household_size));
            }
            limits.insert(row.household_size, row.annual_median_income);
        }

        Self::new(limits)
    }

    pub fn annual_limit(&self, household_size: u8) -> u32 {
        let size = household_size.max(1);
        if let Some(limit) = self.limits.get(&size) {
            return *limit;
        }

        let Some((&largest_size, &largest_limit)) = self.limits.iter().next_back() else {
            return 0;
        };
        if size < largest_size {
            // Gap in the table: fall back to the next larger size.
            return self
                .limits
                .range(size..)
                .next()
                .map(|(_, limit)| *limit)
                .unwrap_or(largest_limit);
        }

        let four_person = self.limits.get(&4).copied().unwrap_or(largest_limit);
        let extra_members = u32::from(size - largest_size);
        let increment = four_person / 100 * EXTRA_MEMBER_INCREMENT_PERCENT;
        largest_limit.saturating_add(increment.saturating_mul(extra_members))
    }
}

impl Default for AreaMedianIncome {
    fn default() -> Self {
        let limits = [
            (1, 68_600),
            (2, 78_400),
            (3, 88_200),
            (4, 98_000),
            (5, 105_850),
            (6, 113_700),
            (7, 121_500),
            (8, 129_350),
        ]
        .into_iter()
        .collect();
        Self { limits }
    }
}

#[derive(Debug, Deserialize)]
struct AmiRow {
    household_size: u8,
    annual_median_income: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum AmiTableError {
    #[error("failed to parse AMI table: {0}")]
    Csv(#[from] csv::Error),
    #[error("AMI table has no rows")]
    Empty,
    #[error("household size {0} is not valid in an AMI table")]
    InvalidHouseholdSize(u8),
}
