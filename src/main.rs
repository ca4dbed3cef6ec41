use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use axum_prometheus::PrometheusMetricLayer;
use bunkmate::config::{AppConfig, BackendConfig};
use bunkmate::error::AppError;
use bunkmate::listings::geo::HttpGeoGateway;
use bunkmate::listings::memory::{MemoryListingRepository, MemoryPhotoStore};
use bunkmate::listings::rest::{RestBackend, RestDataStore, RestPhotoStore};
use bunkmate::listings::router::{listing_router, ListingWizard};
use bunkmate::listings::submit::SubmissionOrchestrator;
use bunkmate::telemetry;
use clap::{Args, Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
struct AppState {
    readiness: Arc<AtomicBool>,
    metrics: PrometheusHandle,
}

#[derive(Parser, Debug)]
#[command(
    name = "Bunkmate Listing Service",
    about = "Serve the Bunkmate sublease listing API from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => run_server(args).await,
    }
}

async fn run_server(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let state = AppState {
        readiness: readiness_flag.clone(),
        metrics: prometheus_handle,
    };

    let geo = Arc::new(HttpGeoGateway::new(
        config.geo.geocode_url.clone(),
        config.geo.geocode_api_key.clone(),
        config.geo.routing_url.clone(),
    )?);

    let api = match config.backend.clone() {
        Some(backend) => rest_api(backend, geo, &config)?,
        None => {
            warn!("BACKEND_URL not set; serving with in-memory stores");
            memory_api(geo, &config)
        }
    };

    let app = Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .with_state(state)
        .merge(api)
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "bunkmate listing service ready");

    axum::serve(listener, app).await?;
    Ok(())
}

fn rest_api(
    backend: BackendConfig,
    geo: Arc<HttpGeoGateway>,
    config: &AppConfig,
) -> Result<Router, AppError> {
    let shared = Arc::new(RestBackend::new(backend.base_url, backend.service_key)?);
    let repository = Arc::new(RestDataStore::new(shared.clone()));
    let photos = Arc::new(RestPhotoStore::new(shared, backend.photo_bucket));
    let orchestrator = SubmissionOrchestrator::new(repository, photos, geo, config.geo.campus);
    Ok(listing_router(Arc::new(ListingWizard::new(orchestrator))))
}

fn memory_api(geo: Arc<HttpGeoGateway>, config: &AppConfig) -> Router {
    let repository = Arc::new(MemoryListingRepository::new());
    let photos = Arc::new(MemoryPhotoStore::new());
    let orchestrator = SubmissionOrchestrator::new(repository, photos, geo, config.geo.campus);
    listing_router(Arc::new(ListingWizard::new(orchestrator)))
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn readiness_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
