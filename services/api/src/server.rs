use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryPsdeRepository, InMemoryWorkflowRepository};
use crate::routes::with_service_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use haven_intake::config::AppConfig;
use haven_intake::error::AppError;
use haven_intake::telemetry;
use haven_intake::workflows::intake::{EligibilityEngine, IntakeService, WorkflowOrchestrator};
use haven_intake::workflows::psde::{AccessPolicy, PsdeService};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let engine = config.engine.clone();
    let orchestrator = WorkflowOrchestrator::new(
        engine.workflow,
        EligibilityEngine::new(engine.eligibility),
    );
    let intake_service = Arc::new(IntakeService::new(
        Arc::new(InMemoryWorkflowRepository::default()),
        orchestrator,
    ));
    let psde_service = Arc::new(PsdeService::new(
        Arc::new(InMemoryPsdeRepository::default()),
        AccessPolicy::new(engine.access),
    ));

    let app = with_service_routes(intake_service, psde_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "intake service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
