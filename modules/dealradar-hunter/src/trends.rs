use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};

use dealradar_common::{Offer, Provider, TrendSummary};

/// Aggregate a set of offers into trend statistics. Pure, no I/O; an empty
/// input yields the zero-valued summary.
pub fn analyze(offers: &[Offer], as_of: DateTime<Utc>) -> TrendSummary {
    if offers.is_empty() {
        return TrendSummary::default();
    }

    let mut summary = TrendSummary::default();
    let mut confidence_total = 0.0f32;

    for offer in offers {
        *summary
            .per_provider_counts
            .entry(offer.provider.as_str().to_string())
            .or_insert(0) += 1;
        confidence_total += offer.confidence_score;

        let age = as_of - offer.discovered_at;
        if age < Duration::hours(24) {
            summary.freshness_buckets.last_day += 1;
        } else if age < Duration::days(7) {
            summary.freshness_buckets.last_week += 1;
        } else {
            summary.freshness_buckets.older += 1;
        }
    }

    summary.average_confidence = confidence_total / offers.len() as f32;
    summary.top_provider = top_provider(&summary.per_provider_counts);
    summary
}

/// Most common provider. Ties resolve to the alphabetically first token so
/// the answer is stable run to run.
fn top_provider(counts: &BTreeMap<String, u32>) -> Option<Provider> {
    let mut best: Option<(&str, u32)> = None;
    for (token, &count) in counts {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((token, count));
        }
    }
    best.map(|(token, _)| Provider::from_token(token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::offer;

    #[test]
    fn empty_input_yields_zero_summary() {
        assert_eq!(analyze(&[], Utc::now()), TrendSummary::default());
    }

    #[test]
    fn counts_average_and_top_provider() {
        let now = Utc::now();
        let offers = vec![
            offer(Provider::Aws, "a", "https://aws.amazon.com/a", 0.9, now),
            offer(Provider::Aws, "b", "https://aws.amazon.com/b", 0.7, now),
            offer(
                Provider::Azure,
                "c",
                "https://learn.microsoft.com/c",
                0.5,
                now,
            ),
        ];

        let summary = analyze(&offers, now);

        assert_eq!(summary.per_provider_counts.get("aws"), Some(&2));
        assert_eq!(summary.per_provider_counts.get("azure"), Some(&1));
        assert!((summary.average_confidence - 0.7).abs() < 1e-6);
        assert_eq!(summary.top_provider, Some(Provider::Aws));
    }

    #[test]
    fn freshness_buckets_split_on_age() {
        let now = Utc::now();
        let offers = vec![
            offer(
                Provider::Aws,
                "an hour old",
                "https://aws.amazon.com/a",
                0.5,
                now - Duration::hours(1),
            ),
            offer(
                Provider::Aws,
                "three days old",
                "https://aws.amazon.com/b",
                0.5,
                now - Duration::days(3),
            ),
            offer(
                Provider::Aws,
                "a month old",
                "https://aws.amazon.com/c",
                0.5,
                now - Duration::days(30),
            ),
        ];

        let summary = analyze(&offers, now);

        assert_eq!(summary.freshness_buckets.last_day, 1);
        assert_eq!(summary.freshness_buckets.last_week, 1);
        assert_eq!(summary.freshness_buckets.older, 1);
    }

    #[test]
    fn top_provider_tie_resolves_alphabetically() {
        let now = Utc::now();
        let offers = vec![
            offer(
                Provider::Databricks,
                "a",
                "https://databricks.com/a",
                0.5,
                now,
            ),
            offer(Provider::Aws, "b", "https://aws.amazon.com/b", 0.5, now),
        ];

        let summary = analyze(&offers, now);

        assert_eq!(summary.top_provider, Some(Provider::Aws));
    }
}
