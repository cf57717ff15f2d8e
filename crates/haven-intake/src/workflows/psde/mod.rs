//! Versioned program-specific data elements with corrections, audit, and VAWA redaction.

pub mod access;
pub mod audit;
pub mod compliance;
pub mod correction;
pub mod domain;
pub mod lifecycle;
pub mod repository;
pub mod router;
pub mod service;
pub mod validation;

#[cfg(test)]
pub(crate) mod tests;

pub use access::{AccessPolicy, AccessPolicyConfig, FieldAccess, RedactionTier, ViewerContext};
pub use audit::{AuditEntryType, AuditSummary, AuditTrail, AuditTrailEntry};
pub use compliance::{calculate_compliance_score, ComplianceScore};
pub use correction::{
    BackdatedEntry, CorrectionError, CorrectionRequest, FamilyChange, RecordFamily,
};
pub use domain::{
    CorrectionReason, FamilyId, LifecycleStatus, PsdePayload, RecordId, Seal, SensitiveRecord,
};
pub use lifecycle::{transition, LifecycleEvent, TransitionRejected};
pub use repository::PsdeRepository;
pub use router::psde_router;
pub use service::{PsdeService, PsdeServiceError};
pub use validation::validate_psde_payload;
