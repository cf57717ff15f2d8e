//! Integration scenarios for versioned program-specific records: corrections, approvals,
//! backdating, sealing, and role-based redaction through the service and HTTP router.

mod common {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use axum::response::Response;
    use chrono::{DateTime, TimeZone, Utc};
    use serde_json::Value;

    use haven_intake::workflows::codes::{DomesticViolenceRecency, DvRedactionLevel, HmisResponse};
    use haven_intake::workflows::psde::router::{ROLES_HEADER, USER_HEADER};
    use haven_intake::workflows::psde::{
        AccessPolicy, FamilyId, PsdePayload, PsdeRepository, PsdeService, RecordFamily, RecordId,
        ViewerContext,
    };
    use haven_intake::workflows::repository::RepositoryError;

    pub(super) fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 15, 30, 0)
            .single()
            .expect("valid timestamp")
    }

    pub(super) fn advocate() -> ViewerContext {
        ViewerContext::new("rosa", ["DV_SPECIALIST"])
    }

    pub(super) fn intake_staff() -> ViewerContext {
        ViewerContext::new("kai", ["INTAKE_STAFF"])
    }

    pub(super) fn supervisor() -> ViewerContext {
        ViewerContext::new("mel", ["SUPERVISOR"])
    }

    pub(super) fn payload() -> PsdePayload {
        PsdePayload {
            information_date: Some(now().date_naive()),
            collected_by: "rosa".to_string(),
            income_from_any_source: HmisResponse::No,
            total_monthly_income: Some(0),
            covered_by_health_insurance: HmisResponse::Yes,
            physical_disability: HmisResponse::No,
            developmental_disability: HmisResponse::No,
            chronic_health_condition: HmisResponse::Yes,
            hiv_aids: HmisResponse::No,
            mental_health_disorder: HmisResponse::No,
            substance_use_disorder: HmisResponse::No,
            domestic_violence: HmisResponse::Yes,
            domestic_violence_recency: DomesticViolenceRecency::WithinThreeMonths,
            currently_fleeing: HmisResponse::Yes,
            dv_redaction_level: DvRedactionLevel::RedactForGeneralStaff,
            ..PsdePayload::default()
        }
    }

    pub(super) fn build_service() -> Arc<PsdeService<MemoryRepository>> {
        let service = PsdeService::new(
            Arc::new(MemoryRepository::default()),
            AccessPolicy::default(),
        )
        .with_clock(now);
        Arc::new(service)
    }

    pub(super) fn request(
        method: &str,
        uri: &str,
        viewer: &ViewerContext,
        body: Option<Value>,
    ) -> Request<Body> {
        let roles: Vec<&str> = viewer.roles.iter().map(String::as_str).collect();
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(USER_HEADER, viewer.user_id.as_str())
            .header(ROLES_HEADER, roles.join(","));
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body).expect("serialize body")))
                .expect("request"),
            None => builder.body(Body::empty()).expect("request"),
        }
    }

    pub(super) async fn read_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[derive(Default, Clone)]
    pub(super) struct MemoryRepository {
        families: Arc<Mutex<HashMap<FamilyId, RecordFamily>>>,
    }

    impl PsdeRepository for MemoryRepository {
        fn insert(&self, family: RecordFamily) -> Result<RecordFamily, RepositoryError> {
            let mut guard = self.families.lock().expect("repository mutex poisoned");
            if guard.contains_key(&family.family_id()) {
                return Err(RepositoryError::Conflict);
            }
            guard.insert(family.family_id(), family.clone());
            Ok(family)
        }

        fn update(
            &self,
            family: RecordFamily,
            expected_revision: u64,
        ) -> Result<(), RepositoryError> {
            let mut guard = self.families.lock().expect("repository mutex poisoned");
            let stored = guard
                .get(&family.family_id())
                .ok_or(RepositoryError::NotFound)?;
            if stored.revision() != expected_revision {
                return Err(RepositoryError::VersionConflict {
                    expected: expected_revision,
                    actual: stored.revision(),
                });
            }
            guard.insert(family.family_id(), family);
            Ok(())
        }

        fn fetch(&self, id: &FamilyId) -> Result<Option<RecordFamily>, RepositoryError> {
            let guard = self.families.lock().expect("repository mutex poisoned");
            Ok(guard.get(id).cloned())
        }

        fn find_by_record(&self, id: &RecordId) -> Result<Option<RecordFamily>, RepositoryError> {
            let guard = self.families.lock().expect("repository mutex poisoned");
            Ok(guard
                .values()
                .find(|family| family.record(*id).is_some())
                .cloned())
        }
    }
}

mod service {
    use super::common::*;
    use chrono::Duration;
    use haven_intake::workflows::codes::HmisResponse;
    use haven_intake::workflows::psde::{
        AuditEntryType, BackdatedEntry, CorrectionError, CorrectionReason, CorrectionRequest,
        LifecycleStatus, PsdePayload, PsdeServiceError,
    };

    fn insurance_fix(reason: CorrectionReason) -> CorrectionRequest {
        CorrectionRequest {
            payload: PsdePayload {
                covered_by_health_insurance: HmisResponse::No,
                ..payload()
            },
            reason,
            justification: "Coverage ended in January".to_string(),
            idempotency_key: None,
        }
    }

    #[test]
    fn every_operation_leaves_one_audit_entry() {
        let service = build_service();
        let created = service.create(payload(), &advocate()).expect("create");
        let family_id = created.family.family_id();

        let updated = service
            .update(&family_id, 1, payload(), None, &advocate())
            .expect("update");
        let pending = service
            .correct(
                &family_id,
                updated.record.version,
                insurance_fix(CorrectionReason::PolicyChange),
                &advocate(),
            )
            .expect("correction");
        service
            .approve(&family_id, pending.record.version, &supervisor())
            .expect("approval");

        let trail = service.audit_trail(&family_id, &advocate()).expect("trail");
        let kinds: Vec<AuditEntryType> = trail.entries().iter().map(|entry| entry.entry_type).collect();
        assert_eq!(
            kinds,
            vec![
                AuditEntryType::Creation,
                AuditEntryType::VersionUpdate,
                AuditEntryType::Correction,
                AuditEntryType::Approval,
            ]
        );
        let correction = &trail.entries()[2];
        assert_eq!(correction.changed_fields, vec!["covered_by_health_insurance"]);
        assert_eq!(correction.correction_reason, Some(CorrectionReason::PolicyChange));
    }

    #[test]
    fn corrections_cannot_be_approved_by_their_author() {
        let service = build_service();
        let created = service.create(payload(), &advocate()).expect("create");
        let family_id = created.family.family_id();
        let pending = service
            .correct(
                &family_id,
                1,
                insurance_fix(CorrectionReason::AuditFinding),
                &advocate(),
            )
            .expect("correction");
        assert_eq!(
            pending.record.lifecycle_status,
            LifecycleStatus::PendingApproval
        );

        assert!(matches!(
            service.approve(&family_id, 2, &advocate()),
            Err(PsdeServiceError::Correction(CorrectionError::SelfApproval))
        ));
        let approved = service
            .approve(&family_id, 2, &supervisor())
            .expect("approval");
        assert_eq!(approved.record.lifecycle_status, LifecycleStatus::Active);
        assert_eq!(approved.record.status_changed_by.as_deref(), Some("mel"));
    }

    #[test]
    fn backdating_closes_the_prior_version_at_the_effective_date() {
        let service = build_service();
        let created = service.create(payload(), &advocate()).expect("create");
        let family_id = created.family.family_id();
        let effective = now() - Duration::days(5);

        let change = service
            .backdate(
                &family_id,
                1,
                BackdatedEntry {
                    payload: payload(),
                    effective_as_of: effective,
                    reason: "Paper form from outreach shift".to_string(),
                },
                &advocate(),
            )
            .expect("backdate");

        assert!(change.record.is_backdated);
        assert_eq!(change.record.effective_start, effective);
        let history = change.family.history();
        assert_eq!(history[0].lifecycle_status, LifecycleStatus::Superseded);
        assert_eq!(history[0].effective_end, Some(effective));
    }

    #[test]
    fn backdating_past_the_window_is_rejected() {
        let service = build_service();
        let created = service.create(payload(), &advocate()).expect("create");
        let family_id = created.family.family_id();

        let result = service.backdate(
            &family_id,
            1,
            BackdatedEntry {
                payload: payload(),
                effective_as_of: now() - Duration::days(45),
                reason: "Late data entry".to_string(),
            },
            &advocate(),
        );

        assert!(matches!(
            result,
            Err(PsdeServiceError::Correction(
                CorrectionError::BackdateOutOfRange { max_days: 30 }
            ))
        ));
        let trail = service.audit_trail(&family_id, &advocate()).expect("trail");
        assert_eq!(trail.len(), 1);
    }

    #[test]
    fn concurrent_writers_on_one_version_conflict() {
        let service = build_service();
        let created = service.create(payload(), &advocate()).expect("create");
        let family_id = created.family.family_id();

        service
            .correct(
                &family_id,
                1,
                insurance_fix(CorrectionReason::DataEntryError),
                &advocate(),
            )
            .expect("first writer");
        let second = service.update(&family_id, 1, payload(), None, &intake_staff());

        assert!(matches!(
            second,
            Err(PsdeServiceError::Correction(CorrectionError::StaleVersion {
                supplied: 1,
                current: 2
            }))
        ));
    }
}

mod routing {
    use super::common::*;
    use axum::http::StatusCode;
    use haven_intake::workflows::psde::psde_router;
    use serde_json::json;
    use tower::ServiceExt;

    #[tokio::test]
    async fn general_staff_see_redacted_history() {
        let service = build_service();
        let body = serde_json::to_value(payload()).expect("serialize payload");
        let created = psde_router(service.clone())
            .oneshot(request("POST", "/api/v1/psde", &advocate(), Some(body)))
            .await
            .expect("route executes");
        assert_eq!(created.status(), StatusCode::CREATED);
        let family_id = read_json(created).await["family_id"]
            .as_str()
            .expect("family id")
            .to_string();

        let correction = json!({
            "previous_version": 1,
            "payload": serde_json::to_value(payload()).expect("serialize payload"),
            "reason": "CLIENT_CORRECTION",
            "justification": "Client clarified recency"
        });
        let corrected = psde_router(service.clone())
            .oneshot(request(
                "POST",
                &format!("/api/v1/psde/{family_id}/corrections"),
                &advocate(),
                Some(correction),
            ))
            .await
            .expect("route executes");
        assert_eq!(corrected.status(), StatusCode::CREATED);

        let history = psde_router(service.clone())
            .oneshot(request(
                "GET",
                &format!("/api/v1/psde/{family_id}/history"),
                &intake_staff(),
                None,
            ))
            .await
            .expect("route executes");
        assert_eq!(history.status(), StatusCode::OK);
        let versions = read_json(history).await;
        let versions = versions.as_array().expect("history array");
        assert_eq!(versions.len(), 2);
        for version in versions {
            assert_eq!(version["payload"]["currently_fleeing"], json!("[REDACTED]"));
        }

        let audit = psde_router(service)
            .oneshot(request(
                "GET",
                &format!("/api/v1/psde/{family_id}/audit"),
                &advocate(),
                None,
            ))
            .await
            .expect("route executes");
        assert_eq!(audit.status(), StatusCode::OK);
        let audit = read_json(audit).await;
        assert_eq!(audit["summary"]["total_versions"], json!(2));
        assert_eq!(audit["summary"]["total_corrections"], json!(1));
    }

    #[tokio::test]
    async fn seal_hides_the_record_until_unsealed() {
        let service = build_service();
        let created = service.create(payload(), &advocate()).expect("create");
        let family_id = created.family.family_id();

        let sealed = psde_router(service.clone())
            .oneshot(request(
                "POST",
                &format!("/api/v1/psde/{family_id}/seal"),
                &advocate(),
                Some(json!({ "reason": "Abuser works at partner agency" })),
            ))
            .await
            .expect("route executes");
        assert_eq!(sealed.status(), StatusCode::OK);

        let hidden = psde_router(service.clone())
            .oneshot(request(
                "GET",
                &format!("/api/v1/psde/{family_id}"),
                &intake_staff(),
                None,
            ))
            .await
            .expect("route executes");
        assert_eq!(hidden.status(), StatusCode::OK);
        let view = read_json(hidden).await;
        assert_eq!(view["sealed"], json!(true));
        assert!(view.get("payload").is_none());

        let unsealed = psde_router(service.clone())
            .oneshot(request(
                "POST",
                &format!("/api/v1/psde/{family_id}/unseal"),
                &advocate(),
                None,
            ))
            .await
            .expect("route executes");
        assert_eq!(unsealed.status(), StatusCode::NO_CONTENT);

        let visible = psde_router(service)
            .oneshot(request(
                "GET",
                &format!("/api/v1/psde/{family_id}"),
                &intake_staff(),
                None,
            ))
            .await
            .expect("route executes");
        let view = read_json(visible).await;
        assert_eq!(view["payload"]["domestic_violence"], json!("yes"));
    }

    #[tokio::test]
    async fn self_approval_is_unprocessable() {
        let service = build_service();
        let created = service.create(payload(), &advocate()).expect("create");
        let family_id = created.family.family_id();
        let correction = json!({
            "previous_version": 1,
            "payload": serde_json::to_value(payload()).expect("serialize payload"),
            "reason": "AUDIT_FINDING",
            "justification": "Monitoring visit finding"
        });
        let pending = psde_router(service.clone())
            .oneshot(request(
                "POST",
                &format!("/api/v1/psde/{family_id}/corrections"),
                &advocate(),
                Some(correction),
            ))
            .await
            .expect("route executes");
        assert_eq!(pending.status(), StatusCode::CREATED);

        let response = psde_router(service)
            .oneshot(request(
                "POST",
                &format!("/api/v1/psde/{family_id}/approve"),
                &advocate(),
                Some(json!({ "previous_version": 2 })),
            ))
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
