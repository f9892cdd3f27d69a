use crate::cli::ServeArgs;
use crate::infra::{request_context, AppState};
use crate::routes::with_scoring_routes;
use axum::{middleware, Extension};
use axum_prometheus::PrometheusMetricLayer;
use credit_risk::config::AppConfig;
use credit_risk::error::AppError;
use credit_risk::scoring::{CreditScoringService, RiskModel, ScoringArtifacts};
use credit_risk::telemetry;
use std::sync::atomic::{AtomicBool, Ordering};
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
    if let Some(dir) = args.artifacts_dir.take() {
        config.artifacts.dir = dir;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let artifacts = ScoringArtifacts::load(&config.artifacts.dir)?;
    let model = artifacts.load_logistic_model(&config.artifacts.dir)?;
    info!(
        model = %model.metadata().model_name,
        version = %model.metadata().model_version,
        "model loaded"
    );
    let scoring_service = Arc::new(CreditScoringService::new(&artifacts, Arc::new(model)));

    let app = with_scoring_routes(scoring_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer)
        .layer(middleware::from_fn(request_context));

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "credit risk scoring service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
