use std::sync::Arc;

use polysleuth::api::router::create_router;
use polysleuth::config::AppConfig;
use polysleuth::db;
use polysleuth::metrics::init_metrics;
use polysleuth::polymarket::{DataClient, GammaClient, PriceClient};
use polysleuth::services::{run_scan_loop, ScanService};
use polysleuth::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    config.validate()?;
    let addr = format!("{}:{}", config.host, config.port);

    let metrics_handle = init_metrics();

    tracing::info!("Connecting to database...");
    let db = db::init_pool(&config.database_url).await?;
    db::run_migrations(&db).await?;
    tracing::info!("Database connected");

    let http = reqwest::Client::new();
    let data_client = match &config.data_api_url {
        Some(url) => DataClient::with_base_url(http.clone(), url.clone()),
        None => DataClient::new(http.clone()),
    };
    let gamma_client = match &config.gamma_api_url {
        Some(url) => GammaClient::with_base_url(http.clone(), url.clone()),
        None => GammaClient::new(http.clone()),
    };
    let price_client = match &config.clob_api_url {
        Some(url) => PriceClient::with_base_url(http.clone(), url.clone()),
        None => PriceClient::new(http),
    };

    let scanner = Arc::new(ScanService::new(
        db.clone(),
        data_client,
        gamma_client,
        price_client,
        config.clone(),
    ));

    // --- Periodic forensic scans over the watchlist ---
    if config.watch_markets.is_empty() {
        tracing::warn!("WATCH_MARKETS is empty — periodic scanning disabled");
    } else {
        let loop_scanner = Arc::clone(&scanner);
        let markets = config.watch_markets.clone();
        let interval = config.scan_interval_secs;
        tracing::info!(markets = markets.len(), "Spawning scan loop");
        tokio::spawn(async move {
            run_scan_loop(loop_scanner, markets, interval).await;
        });
    }

    let state = AppState {
        db,
        config,
        scanner,
        metrics_handle,
    };
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {addr}");
    axum::serve(listener, router).await?;

    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();
}
