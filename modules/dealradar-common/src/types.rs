use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// --- Providers ---

/// The fixed set of certification providers tracked by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    Aws,
    Azure,
    GoogleCloud,
    Databricks,
    Salesforce,
    Unknown,
}

impl Provider {
    /// Stable token used for storage and serialization. Matches the serde
    /// snake_case form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Aws => "aws",
            Provider::Azure => "azure",
            Provider::GoogleCloud => "google_cloud",
            Provider::Databricks => "databricks",
            Provider::Salesforce => "salesforce",
            Provider::Unknown => "unknown",
        }
    }

    /// Total parse: storage tokens plus common aliases. Anything
    /// unrecognized maps to `Unknown` rather than failing.
    pub fn from_token(token: &str) -> Provider {
        match token.trim().to_lowercase().as_str() {
            "aws" | "amazon" => Provider::Aws,
            "azure" | "microsoft" => Provider::Azure,
            "google_cloud" | "google cloud" | "gcp" | "google" => Provider::GoogleCloud,
            "databricks" => Provider::Databricks,
            "salesforce" => Provider::Salesforce,
            _ => Provider::Unknown,
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// --- Offers ---

/// A normalized, persisted promotional offer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    /// Deterministic identity derived from provider + normalized title +
    /// source URL, so re-discovered promotions map to the same record.
    pub offer_id: String,
    pub provider: Provider,
    pub title: String,
    pub snippet: String,
    pub source_url: String,
    /// The discount token matched in the source text, e.g. "20% off".
    pub discount: Option<String>,
    /// Quality estimate in [0, 1]. Used for ranking, never for eligibility.
    pub confidence_score: f32,
    pub discovered_at: DateTime<Utc>,
    /// Past this instant the offer is ineligible for matching and may be
    /// reaped by the store.
    pub expires_at: DateTime<Utc>,
}

impl Offer {
    /// Field-for-field equality excluding the `discovered_at` / `expires_at`
    /// timestamps. An upsert of a content-equal offer is a no-op.
    pub fn content_eq(&self, other: &Offer) -> bool {
        self.offer_id == other.offer_id
            && self.provider == other.provider
            && self.title == other.title
            && self.snippet == other.snippet
            && self.source_url == other.source_url
            && self.discount == other.discount
            && self.confidence_score == other.confidence_score
    }
}

// --- User profiles ---

/// A stored user profile. `user_id` is the only required field; everything
/// else defaults to unset/empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    #[serde(default)]
    pub current_role: Option<String>,
    #[serde(default)]
    pub target_role: Option<String>,
    /// When set, recommendations are restricted to this provider.
    #[serde(default)]
    pub preferred_provider: Option<Provider>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub interests: Vec<String>,
}

impl UserProfile {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            current_role: None,
            target_role: None,
            preferred_provider: None,
            location: None,
            interests: Vec::new(),
        }
    }
}

// --- Search results ---

/// A raw search hit. Transient: passed from the search client or fallback
/// catalog into the normalizer, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub url: String,
    pub title: String,
    pub snippet: String,
}

// --- Pipeline outcomes ---

/// Which data path produced a discovery cycle's results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoverySource {
    Search,
    Fallback,
}

impl std::fmt::Display for DiscoverySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiscoverySource::Search => write!(f, "search"),
            DiscoverySource::Fallback => write!(f, "fallback"),
        }
    }
}

/// Counters for one upsert batch. Failed items are logged and excluded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertSummary {
    pub created: u32,
    pub updated: u32,
    pub unchanged: u32,
}

// --- Trend aggregation ---

/// Offer counts bucketed by age at analysis time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreshnessBuckets {
    /// Discovered within the last 24 hours.
    pub last_day: u32,
    /// Discovered within the last 7 days (excluding `last_day`).
    pub last_week: u32,
    pub older: u32,
}

/// Aggregate statistics over a set of stored offers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendSummary {
    /// Offer counts keyed by provider token. BTreeMap keeps serialization
    /// order stable.
    pub per_provider_counts: BTreeMap<String, u32>,
    pub average_confidence: f32,
    pub freshness_buckets: FreshnessBuckets,
    pub top_provider: Option<Provider>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_token_round_trip() {
        for p in [
            Provider::Aws,
            Provider::Azure,
            Provider::GoogleCloud,
            Provider::Databricks,
            Provider::Salesforce,
            Provider::Unknown,
        ] {
            assert_eq!(Provider::from_token(p.as_str()), p);
        }
    }

    #[test]
    fn provider_aliases() {
        assert_eq!(Provider::from_token("GCP"), Provider::GoogleCloud);
        assert_eq!(Provider::from_token("Microsoft"), Provider::Azure);
        assert_eq!(Provider::from_token("  aws "), Provider::Aws);
        assert_eq!(Provider::from_token("oracle"), Provider::Unknown);
        assert_eq!(Provider::from_token(""), Provider::Unknown);
    }

    #[test]
    fn content_eq_ignores_timestamps() {
        let base = Offer {
            offer_id: "abc123".to_string(),
            provider: Provider::Aws,
            title: "AWS exam voucher".to_string(),
            snippet: "Save $40".to_string(),
            source_url: "https://aws.amazon.com/certification".to_string(),
            discount: Some("save $40".to_string()),
            confidence_score: 0.8,
            discovered_at: Utc::now(),
            expires_at: Utc::now(),
        };
        let mut later = base.clone();
        later.discovered_at = base.discovered_at + chrono::Duration::days(3);
        later.expires_at = base.expires_at + chrono::Duration::days(3);
        assert!(base.content_eq(&later));

        let mut changed = later.clone();
        changed.confidence_score = 0.5;
        assert!(!base.content_eq(&changed));
    }
}
