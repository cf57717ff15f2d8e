//! Versioned record families.
//!
//! A family is the full history of one PSDE record. Every change produces a
//! new family value: versions are never edited in place except for their
//! lifecycle status, and each state-changing operation appends exactly one
//! audit entry. Operations take the version the caller last saw and reject
//! the change when it is no longer the family's latest version.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::audit::{changed_fields, AuditEntryType, AuditTrail, AuditTrailEntry};
use super::domain::{
    CorrectionReason, FamilyId, LifecycleStatus, PsdePayload, RecordId, Seal, SensitiveRecord,
};
use super::lifecycle::{transition, LifecycleEvent, TransitionRejected};
use super::validation::validate_psde_payload;
use crate::workflows::intake::validation::ValidationFinding;

/// Furthest back a backdated entry may take effect without a new intake.
pub const MAX_BACKDATE_DAYS: i64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectionRequest {
    pub payload: PsdePayload,
    pub reason: CorrectionReason,
    pub justification: String,
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackdatedEntry {
    pub payload: PsdePayload,
    pub effective_as_of: DateTime<Utc>,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CorrectionError {
    #[error("a justification is required")]
    MissingJustification,
    #[error("version {supplied} is stale; the family is at version {current}")]
    StaleVersion { supplied: u32, current: u32 },
    #[error("version {0} does not exist in this family")]
    UnknownVersion(u32),
    #[error(transparent)]
    Rejected(#[from] TransitionRejected),
    #[error("payload has {} blocking finding(s)", .0.len())]
    InvalidPayload(Vec<ValidationFinding>),
    #[error("a correction cannot be approved by the person who made it")]
    SelfApproval,
    #[error("record is already sealed")]
    AlreadySealed,
    #[error("record is not sealed")]
    NotSealed,
    #[error("backdated entries must take effect within the last {max_days} days")]
    BackdateOutOfRange { max_days: i64 },
}

/// Result of a family operation: the new family and the version it acted on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FamilyChange {
    pub family: RecordFamily,
    pub record: SensitiveRecord,
    /// True when an idempotency key matched an earlier version.
    pub replayed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFamily {
    family_id: FamilyId,
    versions: Vec<SensitiveRecord>,
    audit: AuditTrail,
    #[serde(default)]
    seal: Option<Seal>,
}

impl RecordFamily {
    pub fn create(
        payload: PsdePayload,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<FamilyChange, CorrectionError> {
        ensure_valid(&payload, now)?;

        let record = SensitiveRecord::first(FamilyId::new(), payload, actor, now);
        let mut family = Self {
            family_id: record.family_id,
            versions: vec![record.clone()],
            audit: AuditTrail::default(),
            seal: None,
        };
        family.record_audit(
            AuditEntryType::Creation,
            &record,
            actor,
            now,
            "Initial version created".to_string(),
            Vec::new(),
        );
        Ok(FamilyChange {
            family,
            record,
            replayed: false,
        })
    }

    pub fn family_id(&self) -> FamilyId {
        self.family_id
    }

    /// Every version, oldest first.
    pub fn history(&self) -> &[SensitiveRecord] {
        &self.versions
    }

    pub fn audit_trail(&self) -> &AuditTrail {
        &self.audit
    }

    pub fn seal(&self) -> Option<&Seal> {
        self.seal.as_ref()
    }

    pub fn is_sealed(&self) -> bool {
        self.seal.is_some()
    }

    /// Bumped by every operation; repositories compare it on write.
    pub fn revision(&self) -> u64 {
        self.audit.len() as u64
    }

    pub fn version(&self, version: u32) -> Option<&SensitiveRecord> {
        self.versions.iter().find(|record| record.version == version)
    }

    pub fn record(&self, record_id: RecordId) -> Option<&SensitiveRecord> {
        self.versions
            .iter()
            .find(|record| record.record_id == record_id)
    }

    pub fn latest(&self) -> Option<&SensitiveRecord> {
        self.versions.last()
    }

    /// The active or pending version; `None` once the family is deleted.
    pub fn current(&self) -> Option<&SensitiveRecord> {
        self.latest()
            .filter(|record| record.lifecycle_status.is_current())
    }

    pub fn active(&self) -> Option<&SensitiveRecord> {
        self.current()
            .filter(|record| record.lifecycle_status == LifecycleStatus::Active)
    }

    pub fn is_deleted(&self) -> bool {
        self.latest()
            .is_some_and(|record| record.lifecycle_status == LifecycleStatus::Deleted)
    }

    pub fn update(
        &self,
        previous: &SensitiveRecord,
        payload: PsdePayload,
        idempotency_key: Option<String>,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<FamilyChange, CorrectionError> {
        if let Some(replay) = self.replay(idempotency_key.as_deref()) {
            return Ok(replay);
        }
        let latest = self.ensure_latest(previous)?;
        let superseded = transition(latest.lifecycle_status, LifecycleEvent::Supersede)?;
        ensure_valid(&payload, now)?;

        let changed = changed_fields(&latest.payload, &payload);
        let mut record = latest.successor(payload, actor, now);
        record.idempotency_key = idempotency_key;

        let mut family = self.clone();
        family.close_latest(superseded, actor, now, now);
        family.versions.push(record.clone());
        family.record_audit(
            AuditEntryType::VersionUpdate,
            &record,
            actor,
            now,
            format!("Version {} supersedes version {}", record.version, latest.version),
            changed,
        );
        Ok(FamilyChange {
            family,
            record,
            replayed: false,
        })
    }

    pub fn correct(
        &self,
        previous: &SensitiveRecord,
        request: CorrectionRequest,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<FamilyChange, CorrectionError> {
        let justification = request.justification.trim();
        if justification.is_empty() {
            return Err(CorrectionError::MissingJustification);
        }
        if let Some(replay) = self.replay(request.idempotency_key.as_deref()) {
            return Ok(replay);
        }
        let latest = self.ensure_latest(previous)?;
        let corrected = transition(latest.lifecycle_status, LifecycleEvent::Correct)?;
        ensure_valid(&request.payload, now)?;

        let changed = changed_fields(&latest.payload, &request.payload);
        let mut record = latest.successor(request.payload, actor, now);
        record.correction_of = Some(latest.record_id);
        record.correction_reason = Some(request.reason);
        record.idempotency_key = request.idempotency_key;
        if request.reason.requires_supervisor_approval() {
            record.lifecycle_status = LifecycleStatus::PendingApproval;
        }

        let mut family = self.clone();
        family.close_latest(corrected, actor, now, now);
        family.versions.push(record.clone());
        let mut entry = AuditTrailEntry {
            timestamp: now,
            entry_type: AuditEntryType::Correction,
            record_id: record.record_id,
            version: record.version,
            modified_by: actor.to_string(),
            description: format!(
                "{}: {justification} (corrects version {})",
                request.reason.description(),
                latest.version
            ),
            changed_fields: changed,
            correction_reason: Some(request.reason),
        };
        if record.lifecycle_status == LifecycleStatus::PendingApproval {
            entry.description.push_str("; awaiting supervisor approval");
        }
        family.audit.append(entry);
        Ok(FamilyChange {
            family,
            record,
            replayed: false,
        })
    }

    /// Soft delete: the latest version is marked deleted and nothing is removed.
    pub fn delete(
        &self,
        previous: &SensitiveRecord,
        justification: &str,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<FamilyChange, CorrectionError> {
        let justification = justification.trim();
        if justification.is_empty() {
            return Err(CorrectionError::MissingJustification);
        }
        let latest = self.ensure_latest(previous)?;
        let deleted = transition(latest.lifecycle_status, LifecycleEvent::Delete)?;

        let mut family = self.clone();
        let record = family
            .close_latest(deleted, actor, now, now)
            .ok_or(CorrectionError::UnknownVersion(previous.version))?;
        family.record_audit(
            AuditEntryType::Deletion,
            &record,
            actor,
            now,
            format!("Deleted: {justification}"),
            Vec::new(),
        );
        Ok(FamilyChange {
            family,
            record,
            replayed: false,
        })
    }

    pub fn approve(
        &self,
        previous: &SensitiveRecord,
        supervisor: &str,
        now: DateTime<Utc>,
    ) -> Result<FamilyChange, CorrectionError> {
        let latest = self.ensure_latest(previous)?;
        let approved = transition(latest.lifecycle_status, LifecycleEvent::Approve)?;
        if latest.created_by == supervisor {
            return Err(CorrectionError::SelfApproval);
        }

        let mut family = self.clone();
        let mut record = latest.clone();
        record.lifecycle_status = approved;
        record.status_changed_by = Some(supervisor.to_string());
        record.status_changed_at = Some(now);
        if let Some(last) = family.versions.last_mut() {
            *last = record.clone();
        }
        family.record_audit(
            AuditEntryType::Approval,
            &record,
            supervisor,
            now,
            format!("Correction version {} approved", record.version),
            Vec::new(),
        );
        Ok(FamilyChange {
            family,
            record,
            replayed: false,
        })
    }

    /// New version whose effective start lies in the recent past.
    pub fn backdate(
        &self,
        previous: &SensitiveRecord,
        entry: BackdatedEntry,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<FamilyChange, CorrectionError> {
        let reason = entry.reason.trim();
        if reason.is_empty() {
            return Err(CorrectionError::MissingJustification);
        }
        if entry.effective_as_of > now
            || now - entry.effective_as_of > Duration::days(MAX_BACKDATE_DAYS)
        {
            return Err(CorrectionError::BackdateOutOfRange {
                max_days: MAX_BACKDATE_DAYS,
            });
        }
        let latest = self.ensure_latest(previous)?;
        let superseded = transition(latest.lifecycle_status, LifecycleEvent::Supersede)?;
        ensure_valid(&entry.payload, now)?;

        let changed = changed_fields(&latest.payload, &entry.payload);
        let mut record = latest.successor(entry.payload, actor, now);
        record.effective_start = entry.effective_as_of;
        record.is_backdated = true;
        record.backdating_reason = Some(reason.to_string());

        let mut family = self.clone();
        family.close_latest(superseded, actor, now, entry.effective_as_of);
        family.versions.push(record.clone());
        family.record_audit(
            AuditEntryType::BackdatedEntry,
            &record,
            actor,
            now,
            format!(
                "Backdated to {}: {reason}",
                entry.effective_as_of.format("%Y-%m-%d")
            ),
            changed,
        );
        Ok(FamilyChange {
            family,
            record,
            replayed: false,
        })
    }

    pub fn seal_family(
        &self,
        actor: &str,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<RecordFamily, CorrectionError> {
        if self.seal.is_some() {
            return Err(CorrectionError::AlreadySealed);
        }
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(CorrectionError::MissingJustification);
        }
        let mut family = self.clone();
        family.seal = Some(Seal {
            sealed_by: actor.to_string(),
            sealed_at: now,
            reason: reason.to_string(),
        });
        if let Some(latest) = self.latest() {
            family.record_audit(
                AuditEntryType::Seal,
                latest,
                actor,
                now,
                format!("Sealed: {reason}"),
                Vec::new(),
            );
        }
        Ok(family)
    }

    pub fn unseal_family(
        &self,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<RecordFamily, CorrectionError> {
        if self.seal.is_none() {
            return Err(CorrectionError::NotSealed);
        }
        let mut family = self.clone();
        family.seal = None;
        if let Some(latest) = self.latest() {
            family.record_audit(
                AuditEntryType::Unseal,
                latest,
                actor,
                now,
                "Seal removed".to_string(),
                Vec::new(),
            );
        }
        Ok(family)
    }

    fn ensure_latest(&self, previous: &SensitiveRecord) -> Result<&SensitiveRecord, CorrectionError> {
        let latest = self
            .latest()
            .ok_or(CorrectionError::UnknownVersion(previous.version))?;
        if previous.family_id != self.family_id || self.record(previous.record_id).is_none() {
            return Err(CorrectionError::UnknownVersion(previous.version));
        }
        if previous.record_id != latest.record_id {
            return Err(CorrectionError::StaleVersion {
                supplied: previous.version,
                current: latest.version,
            });
        }
        Ok(latest)
    }

    fn replay(&self, idempotency_key: Option<&str>) -> Option<FamilyChange> {
        let key = idempotency_key?;
        let record = self
            .versions
            .iter()
            .find(|record| record.idempotency_key.as_deref() == Some(key))?;
        Some(FamilyChange {
            family: self.clone(),
            record: record.clone(),
            replayed: true,
        })
    }

    /// Moves the latest version to `status` and returns the updated copy.
    fn close_latest(
        &mut self,
        status: LifecycleStatus,
        actor: &str,
        now: DateTime<Utc>,
        effective_end: DateTime<Utc>,
    ) -> Option<SensitiveRecord> {
        let latest = self.versions.last_mut()?;
        latest.lifecycle_status = status;
        latest.status_changed_by = Some(actor.to_string());
        latest.status_changed_at = Some(now);
        latest.effective_end = Some(effective_end);
        Some(latest.clone())
    }

    fn record_audit(
        &mut self,
        entry_type: AuditEntryType,
        record: &SensitiveRecord,
        actor: &str,
        now: DateTime<Utc>,
        description: String,
        changed_fields: Vec<String>,
    ) {
        self.audit.append(AuditTrailEntry {
            timestamp: now,
            entry_type,
            record_id: record.record_id,
            version: record.version,
            modified_by: actor.to_string(),
            description,
            changed_fields,
            correction_reason: None,
        });
    }
}

fn ensure_valid(payload: &PsdePayload, now: DateTime<Utc>) -> Result<(), CorrectionError> {
    let report = validate_psde_payload(payload, now.date_naive());
    if report.is_valid {
        Ok(())
    } else {
        Err(CorrectionError::InvalidPayload(report.errors))
    }
}
