use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use dealradar_common::{DiscoverySource, Provider, UpsertSummary};

use crate::dedup::upsert_offers;
use crate::fallback::FallbackSource;
use crate::normalize::Normalizer;
use crate::query::build_query;
use crate::search::SearchClient;
use crate::store::OfferStore;

/// One discovery cycle's input.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryRequest {
    pub topic: Option<String>,
    /// Scopes the fallback catalog. Live search is always topic-wide; the
    /// provider filter only matters in degraded mode.
    pub providers: Vec<Provider>,
}

/// What one cycle did and which data path fed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DiscoveryOutcome {
    #[serde(flatten)]
    pub summary: UpsertSummary,
    pub source: DiscoverySource,
}

/// The search -> normalize -> upsert cycle behind both the `hunter` binary
/// and the API's discover endpoint.
pub struct DiscoveryPipeline {
    search: SearchClient,
    fallback: Arc<dyn FallbackSource>,
    normalizer: Normalizer,
    store: Arc<dyn OfferStore>,
}

impl DiscoveryPipeline {
    pub fn new(
        search: SearchClient,
        fallback: Arc<dyn FallbackSource>,
        normalizer: Normalizer,
        store: Arc<dyn OfferStore>,
    ) -> Self {
        Self {
            search,
            fallback,
            normalizer,
            store,
        }
    }

    /// Run one discovery cycle. A failed search degrades to the fallback
    /// catalog (consulted exactly once); an empty harvest is a zero summary,
    /// not an error.
    pub async fn run(
        &self,
        request: &DiscoveryRequest,
        as_of: DateTime<Utc>,
    ) -> anyhow::Result<DiscoveryOutcome> {
        let cycle_id = format!("cycle-{}", Uuid::new_v4());
        let query = build_query(request.topic.as_deref(), self.normalizer.cutoff_year());
        info!(cycle_id = %cycle_id, query = %query, "Starting discovery cycle");

        // Hygiene only. A failed reap must not block discovery.
        match self.store.reap_expired(as_of).await {
            Ok(reaped) if reaped > 0 => info!(cycle_id = %cycle_id, reaped, "Expired offers reaped"),
            Ok(_) => {}
            Err(err) => warn!(cycle_id = %cycle_id, error = %err, "Expired-offer reap failed"),
        }

        let (hits, source) = match self.search.search(&query).await {
            Ok(hits) => (hits, DiscoverySource::Search),
            Err(err) => {
                warn!(
                    cycle_id = %cycle_id,
                    error = %err,
                    "Search unavailable, using fallback catalog"
                );
                (
                    self.fallback.fetch(&request.providers).await,
                    DiscoverySource::Fallback,
                )
            }
        };

        let offers = self.normalizer.normalize(&hits, as_of);
        let summary = upsert_offers(self.store.as_ref(), &offers).await;

        info!(
            cycle_id = %cycle_id,
            source = %source,
            hits = hits.len(),
            offers = offers.len(),
            created = summary.created,
            updated = summary.updated,
            unchanged = summary.unchanged,
            "Discovery cycle complete"
        );

        Ok(DiscoveryOutcome { summary, source })
    }
}
