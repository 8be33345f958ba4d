use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use dealradar_common::{Config, Provider};
use dealradar_hunter::fallback::CatalogFallback;
use dealradar_hunter::normalize::{Normalizer, NormalizerConfig};
use dealradar_hunter::pipeline::{DiscoveryPipeline, DiscoveryRequest};
use dealradar_hunter::search::{SearchClient, SearchConfig, SerperSearcher};
use dealradar_hunter::store::PgOfferStore;

/// Run one offer discovery cycle against the configured store.
#[derive(Parser, Debug)]
#[command(name = "hunter", about = "Discover and store certification offers")]
struct Args {
    /// Search topic, e.g. "AWS certification". Defaults to the generic
    /// certification-deals topic.
    #[arg(long)]
    topic: Option<String>,

    /// Restrict the fallback catalog to these providers, comma separated
    /// (aws, azure, google_cloud, databricks, salesforce).
    #[arg(long, value_delimiter = ',')]
    providers: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("dealradar=info".parse()?))
        .init();

    let args = Args::parse();
    let config = Config::from_env();

    let store = PgOfferStore::connect(&config.database_url).await?;
    store.migrate().await?;

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
    let pipeline = DiscoveryPipeline::new(
        search,
        Arc::new(CatalogFallback),
        normalizer,
        Arc::new(store),
    );

    let mut providers = Vec::new();
    for token in &args.providers {
        match Provider::from_token(token) {
            Provider::Unknown => warn!(token = %token, "Ignoring unrecognized provider"),
            p => providers.push(p),
        }
    }

    let request = DiscoveryRequest {
        topic: args.topic,
        providers,
    };
    let outcome = pipeline.run(&request, Utc::now()).await?;

    info!(
        source = %outcome.source,
        created = outcome.summary.created,
        updated = outcome.summary.updated,
        unchanged = outcome.summary.unchanged,
        "Hunt complete"
    );
    Ok(())
}
