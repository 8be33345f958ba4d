use tracing::{info, warn};

use dealradar_common::{Offer, UpsertSummary};

use crate::store::OfferStore;

enum Outcome {
    Created,
    Updated,
    Unchanged,
}

/// Write a batch of normalized offers through the store, deduplicating by
/// `offer_id`. A content-equal offer is left untouched so the stored
/// `discovered_at` keeps marking first discovery. A store failure on one
/// offer is logged and skipped; the rest of the batch still lands.
pub async fn upsert_offers(store: &dyn OfferStore, offers: &[Offer]) -> UpsertSummary {
    let mut summary = UpsertSummary::default();
    let mut failed = 0u32;

    for offer in offers {
        match apply(store, offer).await {
            Ok(Outcome::Created) => summary.created += 1,
            Ok(Outcome::Updated) => summary.updated += 1,
            Ok(Outcome::Unchanged) => summary.unchanged += 1,
            Err(err) => {
                failed += 1;
                warn!(
                    offer_id = %offer.offer_id,
                    error = %err,
                    "Skipping offer after store failure"
                );
            }
        }
    }

    info!(
        created = summary.created,
        updated = summary.updated,
        unchanged = summary.unchanged,
        failed,
        "Upsert batch complete"
    );
    summary
}

async fn apply(store: &dyn OfferStore, offer: &Offer) -> crate::store::Result<Outcome> {
    match store.get_offer(&offer.offer_id).await? {
        None => {
            store.put_offer(offer).await?;
            Ok(Outcome::Created)
        }
        Some(existing) if existing.content_eq(offer) => Ok(Outcome::Unchanged),
        Some(_) => {
            store.put_offer(offer).await?;
            Ok(Outcome::Updated)
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use dealradar_common::Provider;

    use super::*;
    use crate::testing::{offer, MockOfferStore};

    #[tokio::test]
    async fn content_equal_reupsert_is_unchanged_and_keeps_discovery_time() {
        let t0 = Utc::now();
        let store = MockOfferStore::new();
        let first = offer(
            Provider::Aws,
            "AWS certification voucher",
            "https://aws.amazon.com/deal",
            0.8,
            t0,
        );

        let summary = upsert_offers(&store, std::slice::from_ref(&first)).await;
        assert_eq!(
            summary,
            UpsertSummary {
                created: 1,
                updated: 0,
                unchanged: 0
            }
        );

        // Rediscovered later with identical content: timestamps differ but
        // nothing else does.
        let mut rediscovered = first.clone();
        rediscovered.discovered_at = t0 + Duration::hours(6);
        rediscovered.expires_at = rediscovered.discovered_at + Duration::days(30);

        let summary = upsert_offers(&store, &[rediscovered]).await;
        assert_eq!(
            summary,
            UpsertSummary {
                created: 0,
                updated: 0,
                unchanged: 1
            }
        );
        let stored = store.offer_by_title("AWS certification voucher").unwrap();
        assert_eq!(stored.discovered_at, t0);
    }

    #[tokio::test]
    async fn changed_content_overwrites_with_fresh_timestamps() {
        let t0 = Utc::now();
        let store = MockOfferStore::new();
        let first = offer(
            Provider::Azure,
            "Azure exam discount",
            "https://learn.microsoft.com/deal",
            0.5,
            t0,
        );
        upsert_offers(&store, std::slice::from_ref(&first)).await;

        let mut revised = first.clone();
        revised.confidence_score = 0.9;
        revised.discovered_at = t0 + Duration::hours(6);
        revised.expires_at = revised.discovered_at + Duration::days(30);

        let summary = upsert_offers(&store, std::slice::from_ref(&revised)).await;
        assert_eq!(
            summary,
            UpsertSummary {
                created: 0,
                updated: 1,
                unchanged: 0
            }
        );
        let stored = store.offer_by_id(&revised.offer_id).unwrap();
        assert_eq!(stored.confidence_score, 0.9);
        assert_eq!(stored.discovered_at, revised.discovered_at);
    }

    #[tokio::test]
    async fn one_failing_write_does_not_sink_the_batch() {
        let now = Utc::now();
        let store = MockOfferStore::new().failing_put_titled("Azure exam discount");
        let batch = vec![
            offer(
                Provider::Aws,
                "AWS certification voucher",
                "https://aws.amazon.com/deal",
                0.8,
                now,
            ),
            offer(
                Provider::Azure,
                "Azure exam discount",
                "https://learn.microsoft.com/deal",
                0.7,
                now,
            ),
            offer(
                Provider::Databricks,
                "Databricks challenge voucher",
                "https://databricks.com/deal",
                0.6,
                now,
            ),
        ];

        let summary = upsert_offers(&store, &batch).await;

        assert_eq!(
            summary,
            UpsertSummary {
                created: 2,
                updated: 0,
                unchanged: 0
            }
        );
        assert_eq!(store.offers_stored(), 2);
        assert!(!store.has_offer_titled("Azure exam discount"));
    }
}
