pub mod api;
pub mod config;
pub mod db;
pub mod errors;
pub mod history;
pub mod intelligence;
pub mod metrics;
pub mod models;
pub mod polymarket;
pub mod services;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::ScanService;

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub config: AppConfig,
    pub scanner: Arc<ScanService>,
    pub metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
}
