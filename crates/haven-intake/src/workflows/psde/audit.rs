//! Append-only audit trail kept alongside every record family.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::domain::{CorrectionReason, PsdePayload, RecordId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditEntryType {
    Creation,
    VersionUpdate,
    Correction,
    BackdatedEntry,
    Deletion,
    Approval,
    Seal,
    Unseal,
}

impl AuditEntryType {
    /// Entry types that add a version to the family.
    pub const fn creates_version(self) -> bool {
        matches!(
            self,
            Self::Creation | Self::VersionUpdate | Self::Correction | Self::BackdatedEntry
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditTrailEntry {
    pub timestamp: DateTime<Utc>,
    pub entry_type: AuditEntryType,
    pub record_id: RecordId,
    pub version: u32,
    pub modified_by: String,
    pub description: String,
    #[serde(default)]
    pub changed_fields: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correction_reason: Option<CorrectionReason>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AuditTrail {
    entries: Vec<AuditTrailEntry>,
}

impl AuditTrail {
    pub fn entries(&self) -> &[AuditTrailEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn append(&mut self, entry: AuditTrailEntry) {
        self.entries.push(entry);
    }

    pub fn summary(&self) -> AuditSummary {
        let involved_users = self
            .entries
            .iter()
            .map(|entry| entry.modified_by.clone())
            .collect();
        AuditSummary {
            total_versions: self
                .entries
                .iter()
                .filter(|entry| entry.entry_type.creates_version())
                .count(),
            total_corrections: self
                .entries
                .iter()
                .filter(|entry| entry.entry_type == AuditEntryType::Correction)
                .count(),
            first_created: self.entries.first().map(|entry| entry.timestamp),
            last_modified: self.entries.last().map(|entry| entry.timestamp),
            involved_users,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditSummary {
    pub total_versions: usize,
    pub total_corrections: usize,
    pub first_created: Option<DateTime<Utc>>,
    pub last_modified: Option<DateTime<Utc>>,
    pub involved_users: BTreeSet<String>,
}

/// Payload fields whose serialized values differ, sorted by name.
pub fn changed_fields(before: &PsdePayload, after: &PsdePayload) -> Vec<String> {
    let (Ok(Value::Object(before)), Ok(Value::Object(after))) =
        (serde_json::to_value(before), serde_json::to_value(after))
    else {
        return Vec::new();
    };

    after
        .iter()
        .filter(|(field, value)| before.get(field.as_str()) != Some(*value))
        .map(|(field, _)| field.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::codes::HmisResponse;

    fn entry(entry_type: AuditEntryType, by: &str, minute: u32) -> AuditTrailEntry {
        let timestamp = DateTime::parse_from_rfc3339(&format!("2025-03-10T09:{minute:02}:00Z"))
            .expect("timestamp")
            .with_timezone(&Utc);
        AuditTrailEntry {
            timestamp,
            entry_type,
            record_id: RecordId::new(),
            version: 1,
            modified_by: by.to_string(),
            description: String::new(),
            changed_fields: Vec::new(),
            correction_reason: None,
        }
    }

    #[test]
    fn summary_counts_versions_and_corrections() {
        let mut trail = AuditTrail::default();
        trail.append(entry(AuditEntryType::Creation, "amy", 0));
        trail.append(entry(AuditEntryType::Correction, "lee", 5));
        trail.append(entry(AuditEntryType::Seal, "amy", 7));
        trail.append(entry(AuditEntryType::VersionUpdate, "kim", 9));

        let summary = trail.summary();
        assert_eq!(summary.total_versions, 3);
        assert_eq!(summary.total_corrections, 1);
        assert_eq!(summary.involved_users.len(), 3);
        assert!(summary.first_created < summary.last_modified);
    }

    #[test]
    fn changed_fields_lists_only_differences() {
        let before = PsdePayload::default();
        let after = PsdePayload {
            domestic_violence: HmisResponse::No,
            total_monthly_income: Some(0),
            ..PsdePayload::default()
        };

        let mut changed = changed_fields(&before, &after);
        changed.sort();
        assert_eq!(changed, vec!["domestic_violence", "total_monthly_income"]);
        assert!(changed_fields(&after, &after).is_empty());
    }
}
