use crate::cli::ServeArgs;
use crate::infra::{warn_on_development_defaults, AppState};
use crate::routes::with_intake_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use credit_intake::config::AppConfig;
use credit_intake::error::AppError;
use credit_intake::intake::{
    AuditStore, CreditIntakeService, HttpScoringClient, InMemoryAuditStore, PgAuditStore,
};
use credit_intake::telemetry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
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
    warn_on_development_defaults(&config);

    if args.in_memory {
        info!("audit records kept in process memory");
        serve_with(config, Arc::new(InMemoryAuditStore::default())).await
    } else {
        let store = PgAuditStore::connect(&config.storage.database_url).await?;
        serve_with(config, Arc::new(store)).await
    }
}

async fn serve_with<R>(config: AppConfig, store: Arc<R>) -> Result<(), AppError>
where
    R: AuditStore + 'static,
{
    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let scoring = HttpScoringClient::new(config.scoring.clone())?;
    info!(endpoint = scoring.endpoint(), "scoring client configured");
    let service = Arc::new(CreditIntakeService::new(Arc::new(scoring), store));

    let app = with_intake_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "credit intake service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
