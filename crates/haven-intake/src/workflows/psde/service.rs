use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{info, warn};

use super::access::{AccessPolicy, ViewerContext};
use super::audit::AuditTrail;
use super::compliance::{calculate_compliance_score, ComplianceScore};
use super::correction::{
    BackdatedEntry, CorrectionError, CorrectionRequest, FamilyChange, RecordFamily,
};
use super::domain::{FamilyId, PsdePayload, SensitiveRecord};
use super::repository::PsdeRepository;
use crate::telemetry::AUDIT_TARGET;
use crate::workflows::repository::RepositoryError;

#[derive(Debug, thiserror::Error)]
pub enum PsdeServiceError {
    #[error(transparent)]
    Correction(#[from] CorrectionError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("access denied: {0}")]
    Forbidden(String),
}

/// Service composing record families with persistence and the access policy.
pub struct PsdeService<R> {
    repository: Arc<R>,
    policy: Arc<AccessPolicy>,
    clock: fn() -> DateTime<Utc>,
}

impl<R> PsdeService<R>
where
    R: PsdeRepository + 'static,
{
    pub fn new(repository: Arc<R>, policy: AccessPolicy) -> Self {
        Self {
            repository,
            policy: Arc::new(policy),
            clock: Utc::now,
        }
    }

    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    pub fn create(
        &self,
        payload: PsdePayload,
        actor: &ViewerContext,
    ) -> Result<FamilyChange, PsdeServiceError> {
        let change = RecordFamily::create(payload, &actor.user_id, (self.clock)())?;
        let family = self.repository.insert(change.family)?;
        info!(
            target: AUDIT_TARGET,
            family_id = %family.family_id(),
            record_id = %change.record.record_id,
            actor = %actor.user_id,
            high_sensitivity = change.record.is_high_sensitivity_dv_case,
            "psde record created"
        );
        Ok(FamilyChange { family, ..change })
    }

    pub fn update(
        &self,
        family_id: &FamilyId,
        previous_version: u32,
        payload: PsdePayload,
        idempotency_key: Option<String>,
        actor: &ViewerContext,
    ) -> Result<FamilyChange, PsdeServiceError> {
        let family = self.visible(family_id, actor)?;
        let previous = version_of(&family, previous_version)?;
        let change = family.update(
            &previous,
            payload,
            idempotency_key,
            &actor.user_id,
            (self.clock)(),
        )?;
        self.persist(&family, &change, "psde version updated", actor)?;
        Ok(change)
    }

    pub fn correct(
        &self,
        family_id: &FamilyId,
        previous_version: u32,
        request: CorrectionRequest,
        actor: &ViewerContext,
    ) -> Result<FamilyChange, PsdeServiceError> {
        let family = self.visible(family_id, actor)?;
        let previous = version_of(&family, previous_version)?;
        let reason = request.reason;
        let change = match family.correct(&previous, request, &actor.user_id, (self.clock)()) {
            Ok(change) => change,
            Err(error) => {
                warn!(
                    target: AUDIT_TARGET,
                    family_id = %family_id,
                    actor = %actor.user_id,
                    reason = reason.code(),
                    %error,
                    "psde correction rejected"
                );
                return Err(error.into());
            }
        };
        self.persist(&family, &change, "psde record corrected", actor)?;
        Ok(change)
    }

    pub fn backdate(
        &self,
        family_id: &FamilyId,
        previous_version: u32,
        entry: BackdatedEntry,
        actor: &ViewerContext,
    ) -> Result<FamilyChange, PsdeServiceError> {
        let family = self.visible(family_id, actor)?;
        let previous = version_of(&family, previous_version)?;
        let change = family.backdate(&previous, entry, &actor.user_id, (self.clock)())?;
        self.persist(&family, &change, "psde backdated entry recorded", actor)?;
        Ok(change)
    }

    pub fn delete(
        &self,
        family_id: &FamilyId,
        previous_version: u32,
        justification: &str,
        actor: &ViewerContext,
    ) -> Result<FamilyChange, PsdeServiceError> {
        let family = self.visible(family_id, actor)?;
        let previous = version_of(&family, previous_version)?;
        let change = family.delete(&previous, justification, &actor.user_id, (self.clock)())?;
        self.persist(&family, &change, "psde record deleted", actor)?;
        Ok(change)
    }

    pub fn approve(
        &self,
        family_id: &FamilyId,
        previous_version: u32,
        supervisor: &ViewerContext,
    ) -> Result<FamilyChange, PsdeServiceError> {
        let family = self.visible(family_id, supervisor)?;
        let previous = version_of(&family, previous_version)?;
        let change = family.approve(&previous, &supervisor.user_id, (self.clock)())?;
        self.persist(&family, &change, "psde correction approved", supervisor)?;
        Ok(change)
    }

    pub fn seal(
        &self,
        family_id: &FamilyId,
        reason: &str,
        actor: &ViewerContext,
    ) -> Result<RecordFamily, PsdeServiceError> {
        let family = self.visible(family_id, actor)?;
        let sealed = family.seal_family(&actor.user_id, reason, (self.clock)())?;
        self.repository
            .update(sealed.clone(), family.revision())?;
        info!(
            target: AUDIT_TARGET,
            family_id = %family_id,
            actor = %actor.user_id,
            "psde family sealed"
        );
        Ok(sealed)
    }

    pub fn unseal(
        &self,
        family_id: &FamilyId,
        actor: &ViewerContext,
    ) -> Result<RecordFamily, PsdeServiceError> {
        let family = self.visible(family_id, actor)?;
        let unsealed = family.unseal_family(&actor.user_id, (self.clock)())?;
        self.repository
            .update(unsealed.clone(), family.revision())?;
        info!(
            target: AUDIT_TARGET,
            family_id = %family_id,
            actor = %actor.user_id,
            "psde family unsealed"
        );
        Ok(unsealed)
    }

    /// Redacted view of the latest version; after deletion that is the deleted one.
    pub fn view(
        &self,
        family_id: &FamilyId,
        viewer: &ViewerContext,
    ) -> Result<Value, PsdeServiceError> {
        let family = self.fetch(family_id)?;
        let record = family.latest().ok_or(RepositoryError::NotFound)?;
        let view = self.policy.redact_record(viewer, record, family.seal());
        self.log_view(&family, record, viewer);
        Ok(view)
    }

    pub fn history(
        &self,
        family_id: &FamilyId,
        viewer: &ViewerContext,
    ) -> Result<Vec<Value>, PsdeServiceError> {
        let family = self.fetch(family_id)?;
        let views = family
            .history()
            .iter()
            .map(|record| self.policy.redact_record(viewer, record, family.seal()))
            .collect();
        info!(
            target: AUDIT_TARGET,
            family_id = %family_id,
            viewer = %viewer.user_id,
            versions = family.history().len(),
            "psde history viewed"
        );
        Ok(views)
    }

    pub fn audit_trail(
        &self,
        family_id: &FamilyId,
        viewer: &ViewerContext,
    ) -> Result<AuditTrail, PsdeServiceError> {
        let family = self.visible(family_id, viewer)?;
        Ok(family.audit_trail().clone())
    }

    pub fn compliance(
        &self,
        family_id: &FamilyId,
        viewer: &ViewerContext,
    ) -> Result<ComplianceScore, PsdeServiceError> {
        let family = self.visible(family_id, viewer)?;
        let record = family.latest().ok_or(RepositoryError::NotFound)?;
        Ok(calculate_compliance_score(record))
    }

    fn fetch(&self, family_id: &FamilyId) -> Result<RecordFamily, PsdeServiceError> {
        let family = self
            .repository
            .fetch(family_id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(family)
    }

    /// Fetches the family, refusing viewers a seal hides it from.
    fn visible(
        &self,
        family_id: &FamilyId,
        viewer: &ViewerContext,
    ) -> Result<RecordFamily, PsdeServiceError> {
        let family = self.fetch(family_id)?;
        if !self.policy.can_see_sealed(viewer, family.seal()) {
            warn!(
                target: AUDIT_TARGET,
                family_id = %family_id,
                viewer = %viewer.user_id,
                "sealed psde family access refused"
            );
            return Err(PsdeServiceError::Forbidden("record is sealed".to_string()));
        }
        Ok(family)
    }

    fn persist(
        &self,
        before: &RecordFamily,
        change: &FamilyChange,
        message: &'static str,
        actor: &ViewerContext,
    ) -> Result<(), RepositoryError> {
        if change.replayed {
            info!(
                target: AUDIT_TARGET,
                family_id = %before.family_id(),
                record_id = %change.record.record_id,
                actor = %actor.user_id,
                "psde request replayed by idempotency key"
            );
            return Ok(());
        }
        self.repository
            .update(change.family.clone(), before.revision())?;
        info!(
            target: AUDIT_TARGET,
            family_id = %before.family_id(),
            record_id = %change.record.record_id,
            version = change.record.version,
            status = change.record.lifecycle_status.label(),
            actor = %actor.user_id,
            "{message}"
        );
        Ok(())
    }

    fn log_view(&self, family: &RecordFamily, record: &SensitiveRecord, viewer: &ViewerContext) {
        let tier = self
            .policy
            .redaction_tier(viewer, record.dv_redaction_level());
        info!(
            target: AUDIT_TARGET,
            family_id = %family.family_id(),
            record_id = %record.record_id,
            viewer = %viewer.user_id,
            sealed = family.is_sealed(),
            redaction = ?tier,
            "psde record viewed"
        );
    }
}

fn version_of(family: &RecordFamily, version: u32) -> Result<SensitiveRecord, CorrectionError> {
    family
        .version(version)
        .cloned()
        .ok_or(CorrectionError::UnknownVersion(version))
}
