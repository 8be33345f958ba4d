use async_trait::async_trait;
use tracing::info;

use dealradar_common::{Provider, SearchResult};

use crate::providers::PROFILES;

// --- FallbackSource trait ---

/// Degraded-mode supply of raw results when live search is unavailable.
/// Infallible by contract: a fallback that can fail defeats its purpose.
#[async_trait]
pub trait FallbackSource: Send + Sync {
    async fn fetch(&self, providers: &[Provider]) -> Vec<SearchResult>;
}

// --- CatalogFallback ---

/// Serves the curated offers baked into the provider catalog. An empty
/// provider filter means every known provider.
pub struct CatalogFallback;

#[async_trait]
impl FallbackSource for CatalogFallback {
    async fn fetch(&self, providers: &[Provider]) -> Vec<SearchResult> {
        let results: Vec<SearchResult> = PROFILES
            .iter()
            .filter(|p| providers.is_empty() || providers.contains(&p.provider))
            .flat_map(|p| p.fallback_offers.iter())
            .map(|offer| SearchResult {
                url: offer.url.to_string(),
                title: offer.title.to_string(),
                snippet: offer.snippet.to_string(),
            })
            .collect();

        info!(count = results.len(), "Serving catalog fallback offers");
        results
    }
}
