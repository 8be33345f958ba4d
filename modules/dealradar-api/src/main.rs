use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use dealradar_common::Config;
use dealradar_hunter::fallback::CatalogFallback;
use dealradar_hunter::normalize::{Normalizer, NormalizerConfig};
use dealradar_hunter::pipeline::DiscoveryPipeline;
use dealradar_hunter::search::{SearchClient, SearchConfig, SerperSearcher};
use dealradar_hunter::store::{OfferStore, PgOfferStore};

mod rest;

pub struct AppState {
    pub pipeline: DiscoveryPipeline,
    pub store: Arc<dyn OfferStore>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("dealradar=info".parse()?))
        .init();

    let config = Config::from_env();

    let store = PgOfferStore::connect(&config.database_url).await?;
    store.migrate().await?;
    let store: Arc<dyn OfferStore> = Arc::new(store);

    let searcher = Arc::new(SerperSearcher::new(
        &config.serper_api_key,
        Duration::from_secs(config.search_timeout_secs),
    ));
    let search = SearchClient::new(
        searcher,
        SearchConfig {
            max_results: config.search_max_results,
            max_attempts: config.search_max_attempts,
            retry_base: Duration::from_secs(1),
            overall_budget: Duration::from_secs(config.search_budget_secs),
        },
    );
    let normalizer = Normalizer::new(NormalizerConfig::new(
        config.cutoff_year,
        config.max_age_months,
        config.confidence_weights,
    ));
    let pipeline =
        DiscoveryPipeline::new(search, Arc::new(CatalogFallback), normalizer, store.clone());

    let state = Arc::new(AppState { pipeline, store });

    let app = Router::new()
        // Health check
        .route("/", get(|| async { "ok" }))
        // REST API
        .route("/api/discover", post(rest::api_discover))
        .route("/api/recommendations/{user_id}", get(rest::api_recommendations))
        .route("/api/profile", post(rest::api_save_profile))
        .route("/api/trends", get(rest::api_trends))
        .with_state(state)
        // CORS
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        // Logging layer: method + path + status + latency only (no query params)
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                }),
        );

    let addr = format!("{}:{}", config.web_host, config.web_port);
    info!("Deal Radar API starting on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
