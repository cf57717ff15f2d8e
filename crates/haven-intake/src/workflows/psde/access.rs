//! Field-level access decisions for sensitive records.
//!
//! Decisions depend on the viewer's roles, the record's redaction level, and
//! any seal on the family. Role names are opaque strings; which roles count as
//! DV specialists or administrators comes from [`AccessPolicyConfig`].

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::domain::{Seal, SensitiveRecord};
use crate::workflows::codes::DvRedactionLevel;

pub const REDACTED: &str = "[REDACTED]";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldAccess {
    Allow,
    Mask,
    Omit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedactionTier {
    None,
    Partial,
    Full,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewerContext {
    pub user_id: String,
    pub roles: BTreeSet<String>,
}

impl ViewerContext {
    pub fn new<I, S>(user_id: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            user_id: user_id.into(),
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    fn has_any(&self, roles: &BTreeSet<String>) -> bool {
        !self.roles.is_disjoint(roles)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessPolicyConfig {
    /// Roles that see through seals and every level short of victim-requested confidentiality.
    pub override_roles: BTreeSet<String>,
    /// Roles cleared for the detail fields at the general-staff level.
    pub sensitive_dv_roles: BTreeSet<String>,
    /// Roles cleared for the detail fields at the non-specialist level.
    pub dv_specialist_roles: BTreeSet<String>,
    /// Fields hidden under full redaction.
    pub sensitive_fields: BTreeSet<String>,
    /// Fields hidden under partial redaction.
    pub detail_fields: BTreeSet<String>,
}

fn set(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|value| value.to_string()).collect()
}

impl Default for AccessPolicyConfig {
    fn default() -> Self {
        let detail = [
            "domestic_violence_recency",
            "currently_fleeing",
            "vawa_confidentiality_requested",
            "is_high_sensitivity_dv_case",
        ];
        let mut sensitive = set(&detail);
        sensitive.extend(set(&["domestic_violence", "dv_redaction_level"]));

        Self {
            override_roles: set(&["ADMIN", "SYSTEM_ADMINISTRATOR", "DATA_MANAGER"]),
            sensitive_dv_roles: set(&["DV_SPECIALIST", "ADMIN", "SAFETY_COORDINATOR"]),
            dv_specialist_roles: set(&["DV_SPECIALIST"]),
            sensitive_fields: sensitive,
            detail_fields: set(&detail),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessPolicy {
    config: AccessPolicyConfig,
}

impl AccessPolicy {
    pub fn new(config: AccessPolicyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AccessPolicyConfig {
        &self.config
    }

    pub fn is_override(&self, viewer: &ViewerContext) -> bool {
        viewer.has_any(&self.config.override_roles)
    }

    /// Sealed records are visible only to the sealing actor and override roles.
    pub fn can_see_sealed(&self, viewer: &ViewerContext, seal: Option<&Seal>) -> bool {
        match seal {
            None => true,
            Some(seal) => seal.sealed_by == viewer.user_id || self.is_override(viewer),
        }
    }

    pub fn redaction_tier(&self, viewer: &ViewerContext, level: DvRedactionLevel) -> RedactionTier {
        if level == DvRedactionLevel::VictimRequestedConfidentiality {
            return RedactionTier::Full;
        }
        if self.is_override(viewer) {
            return RedactionTier::None;
        }
        match level {
            DvRedactionLevel::NoRedaction => RedactionTier::None,
            DvRedactionLevel::RedactForGeneralStaff
                if viewer.has_any(&self.config.sensitive_dv_roles) =>
            {
                RedactionTier::None
            }
            DvRedactionLevel::RedactForNonDvSpecialists
                if viewer.has_any(&self.config.dv_specialist_roles) =>
            {
                RedactionTier::None
            }
            DvRedactionLevel::RedactForGeneralStaff
            | DvRedactionLevel::RedactForNonDvSpecialists => RedactionTier::Partial,
            DvRedactionLevel::FullRedactionRequired
            | DvRedactionLevel::VictimRequestedConfidentiality => RedactionTier::Full,
        }
    }

    pub fn can_view_field(
        &self,
        viewer: &ViewerContext,
        record: &SensitiveRecord,
        seal: Option<&Seal>,
        field: &str,
    ) -> FieldAccess {
        if !self.can_see_sealed(viewer, seal) {
            return FieldAccess::Omit;
        }
        let hidden = match self.redaction_tier(viewer, record.dv_redaction_level()) {
            RedactionTier::None => false,
            RedactionTier::Partial => self.config.detail_fields.contains(field),
            RedactionTier::Full => self.config.sensitive_fields.contains(field),
        };
        if hidden {
            FieldAccess::Mask
        } else {
            FieldAccess::Allow
        }
    }

    /// JSON view of `record` with masked fields replaced and sealed bodies dropped.
    pub fn redact_record(
        &self,
        viewer: &ViewerContext,
        record: &SensitiveRecord,
        seal: Option<&Seal>,
    ) -> Value {
        if !self.can_see_sealed(viewer, seal) {
            return serde_json::json!({
                "record_id": record.record_id,
                "family_id": record.family_id,
                "sealed": true,
            });
        }

        let Ok(Value::Object(mut view)) = serde_json::to_value(record) else {
            return Value::Null;
        };
        self.apply(viewer, record, seal, &mut view);
        if let Some(Value::Object(payload)) = view.get_mut("payload") {
            self.apply(viewer, record, seal, payload);
        }
        Value::Object(view)
    }

    fn apply(
        &self,
        viewer: &ViewerContext,
        record: &SensitiveRecord,
        seal: Option<&Seal>,
        fields: &mut Map<String, Value>,
    ) {
        let keys: Vec<String> = fields.keys().cloned().collect();
        for key in keys {
            match self.can_view_field(viewer, record, seal, &key) {
                FieldAccess::Allow => {}
                FieldAccess::Mask => {
                    fields.insert(key, Value::String(REDACTED.to_string()));
                }
                FieldAccess::Omit => {
                    fields.remove(&key);
                }
            }
        }
    }
}
