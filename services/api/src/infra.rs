use credit_intake::config::{AppConfig, AppEnvironment};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::warn;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Production deployments must override every development default.
pub(crate) fn warn_on_development_defaults(config: &AppConfig) {
    if config.environment != AppEnvironment::Production {
        return;
    }
    for setting in config.development_defaults() {
        warn!(setting, "production is running with a development default");
    }
}
