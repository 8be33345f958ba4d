use std::sync::LazyLock;

use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use sha2::{Digest, Sha256};
use tracing::debug;

use dealradar_common::{ConfidenceWeights, Offer, Provider, SearchResult};

use crate::providers::{official_domain, resolve_provider};

/// Source credit for results hosted on an official provider domain vs
/// everywhere else.
const OFFICIAL_SOURCE_CREDIT: f32 = 0.9;
const UNOFFICIAL_SOURCE_CREDIT: f32 = 0.4;

/// Recency credit when the text carries no year token at all. Dated-current
/// results score 1.0; undated ones are kept but penalized.
const NO_YEAR_RECENCY_CREDIT: f32 = 0.4;

/// Snippet length treated as "complete" for the completeness component.
const SNIPPET_TARGET_LEN: usize = 160;

// --- Extraction patterns ---

static YEAR_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(19\d{2}|20\d{2})\b").unwrap());

static CHALLENGE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bchallenge\b").unwrap());

static PERCENT_OFF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b\d{1,3}\s*%\s*(?:off|discount)\b").unwrap());

static DISCOUNT_PERCENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:discount|save)\s*:?\s*\d{1,3}\s*%").unwrap());

static SAVE_AMOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bsave\s*\$\s*\d+\b").unwrap());

static FREE_EXAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bfree\s+(?:exam|voucher|retake|certification)\b").unwrap()
});

static VOUCHER_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:voucher|coupon|promo\s*code|discount\s*code)\b").unwrap()
});

/// First discount-ish token in the text, checked in specificity order so a
/// concrete "20% off" beats a bare "voucher" mention. The matched text is
/// carried verbatim.
fn extract_discount(text: &str) -> Option<String> {
    let patterns: [&Regex; 5] = [
        &PERCENT_OFF,
        &DISCOUNT_PERCENT,
        &SAVE_AMOUNT,
        &FREE_EXAM,
        &VOUCHER_TOKEN,
    ];
    for re in patterns {
        if let Some(m) = re.find(text) {
            return Some(m.as_str().trim().to_string());
        }
    }
    None
}

/// Recency credit for the text, or `None` when years were found and every
/// one predates the cutoff. The stale-year drop is a hard filter. A
/// "challenge" token stands in for a missing year, never for a stale one.
fn recency_credit(text: &str, cutoff_year: i32) -> Option<f32> {
    let mut saw_year = false;
    for m in YEAR_TOKEN.find_iter(text) {
        saw_year = true;
        if m.as_str().parse::<i32>().is_ok_and(|y| y >= cutoff_year) {
            return Some(1.0);
        }
    }
    if saw_year {
        return None;
    }
    if CHALLENGE_TOKEN.is_match(text) {
        return Some(1.0);
    }
    Some(NO_YEAR_RECENCY_CREDIT)
}

/// Deterministic offer identity: first 16 hex chars of the SHA-256 of the
/// provider token, lowercased whitespace-collapsed title, and trimmed URL.
pub fn offer_id(provider: Provider, title: &str, url: &str) -> String {
    let normalized_title = title
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let mut hasher = Sha256::new();
    hasher.update(provider.as_str().as_bytes());
    hasher.update(b"\n");
    hasher.update(normalized_title.as_bytes());
    hasher.update(b"\n");
    hasher.update(url.trim().as_bytes());
    hex::encode(&hasher.finalize()[..8])
}

// --- Normalizer ---

#[derive(Debug, Clone)]
pub struct NormalizerConfig {
    /// Results whose year tokens are all older than this are dropped.
    pub cutoff_year: i32,
    /// How long a freshly normalized offer stays eligible.
    pub max_age: Duration,
    pub weights: ConfidenceWeights,
}

impl NormalizerConfig {
    pub fn new(cutoff_year: i32, max_age_months: i64, weights: ConfidenceWeights) -> Self {
        Self {
            cutoff_year,
            max_age: Duration::days(30 * max_age_months),
            weights,
        }
    }
}

/// Turns raw search hits into scored `Offer` records. Malformed and stale
/// hits are skipped with a logged reason; output order is unspecified.
pub struct Normalizer {
    config: NormalizerConfig,
}

impl Normalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }

    pub fn cutoff_year(&self) -> i32 {
        self.config.cutoff_year
    }

    pub fn normalize(&self, results: &[SearchResult], as_of: DateTime<Utc>) -> Vec<Offer> {
        results
            .iter()
            .filter_map(|result| self.normalize_one(result, as_of))
            .collect()
    }

    fn normalize_one(&self, result: &SearchResult, as_of: DateTime<Utc>) -> Option<Offer> {
        let title = result.title.trim();
        let snippet = result.snippet.trim();
        if title.is_empty() && snippet.is_empty() {
            debug!(url = %result.url, "Skipping result with no text");
            return None;
        }

        let source_url = result.url.trim();
        if url::Url::parse(source_url).is_err() {
            debug!(url = %result.url, "Skipping result with unparseable URL");
            return None;
        }

        let text = format!("{title} {snippet}");
        let recency = match recency_credit(&text, self.config.cutoff_year) {
            Some(credit) => credit,
            None => {
                debug!(url = %result.url, title, "Dropping stale result");
                return None;
            }
        };

        let provider = resolve_provider(title, snippet, source_url);
        let discount = extract_discount(&text);
        let confidence_score = self.score(source_url, snippet, discount.is_some(), recency);

        Some(Offer {
            offer_id: offer_id(provider, title, source_url),
            provider,
            title: title.to_string(),
            snippet: snippet.to_string(),
            source_url: source_url.to_string(),
            discount,
            confidence_score,
            discovered_at: as_of,
            expires_at: as_of + self.config.max_age,
        })
    }

    fn score(&self, url: &str, snippet: &str, has_discount: bool, recency: f32) -> f32 {
        let w = &self.config.weights;
        let discount = if has_discount { 1.0 } else { 0.0 };
        let source = if official_domain(url) {
            OFFICIAL_SOURCE_CREDIT
        } else {
            UNOFFICIAL_SOURCE_CREDIT
        };
        let completeness = (snippet.len() as f32 / SNIPPET_TARGET_LEN as f32).min(1.0);

        (w.discount * discount + w.recency * recency + w.source * source
            + w.completeness * completeness)
            .clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::search_hit;

    fn normalizer(cutoff_year: i32) -> Normalizer {
        Normalizer::new(NormalizerConfig::new(
            cutoff_year,
            1,
            ConfidenceWeights::default(),
        ))
    }

    #[test]
    fn current_hit_kept_and_stale_hit_dropped() {
        let results = vec![
            search_hit(
                "AWS re/Start 2025 discount 20%",
                "Graduates get a 20% discount voucher for any associate certification exam.",
                "https://aws.amazon.com/restart/",
            ),
            search_hit(
                "Old AWS promo 2022",
                "This promotion ended in 2022.",
                "https://example.com/old-aws-promo",
            ),
        ];

        let offers = normalizer(2025).normalize(&results, Utc::now());

        assert_eq!(offers.len(), 1);
        let offer = &offers[0];
        assert_eq!(offer.provider, Provider::Aws);
        assert!(offer.discount.is_some());
        assert!(
            offer.confidence_score > 0.8,
            "expected a high score, got {}",
            offer.confidence_score
        );
    }

    #[test]
    fn missing_year_scores_below_dated_equivalent() {
        let dated = search_hit(
            "Azure certification voucher 2025",
            "Half price AZ-104 exam vouchers.",
            "https://learn.microsoft.com/certifications/deals",
        );
        let undated = search_hit(
            "Azure certification voucher",
            "Half price AZ-104 exam vouchers.",
            "https://learn.microsoft.com/certifications/deals",
        );

        let n = normalizer(2025);
        let as_of = Utc::now();
        let dated_score = n.normalize(&[dated], as_of)[0].confidence_score;
        let undated_score = n.normalize(&[undated], as_of)[0].confidence_score;

        assert!(
            undated_score < dated_score,
            "undated {undated_score} should rank below dated {dated_score}"
        );
    }

    #[test]
    fn challenge_token_counts_as_current() {
        let result = search_hit(
            "Databricks learning challenge",
            "Complete the challenge and earn a free certification voucher.",
            "https://databricks.com/learn/challenge",
        );

        let offers = normalizer(2025).normalize(&[result], Utc::now());

        assert_eq!(offers.len(), 1);
        assert!(offers[0].confidence_score > 0.5);
    }

    #[test]
    fn stale_year_with_challenge_is_still_dropped() {
        let result = search_hit(
            "Databricks certification challenge 2022",
            "This challenge ended in 2022.",
            "https://databricks.com/learn/challenge",
        );

        let offers = normalizer(2025).normalize(&[result], Utc::now());

        assert!(offers.is_empty());
    }

    #[test]
    fn malformed_hits_are_skipped() {
        let results = vec![
            search_hit("", "", "https://example.com/empty"),
            search_hit("GCP voucher", "Save $100 on any exam.", "not a url"),
            search_hit(
                "Google Cloud voucher",
                "Save $100 on any certification exam.",
                "https://cloud.google.com/certification",
            ),
        ];

        let offers = normalizer(2025).normalize(&results, Utc::now());

        assert_eq!(offers.len(), 1);
        assert_eq!(offers[0].provider, Provider::GoogleCloud);
    }

    #[test]
    fn discount_extraction_prefers_concrete_tokens() {
        assert_eq!(
            extract_discount("Grab a voucher: 30% off all exams"),
            Some("30% off".to_string())
        );
        assert_eq!(
            extract_discount("AWS re/Start 2025 discount 20%"),
            Some("discount 20%".to_string())
        );
        assert_eq!(
            extract_discount("Save $75 when you register early"),
            Some("Save $75".to_string())
        );
        assert_eq!(
            extract_discount("Free exam retake included"),
            Some("Free exam".to_string())
        );
        assert_eq!(
            extract_discount("Use the promo code at checkout"),
            Some("promo code".to_string())
        );
        assert_eq!(extract_discount("Certification study guide"), None);
    }

    #[test]
    fn offer_id_is_stable_across_title_whitespace_and_case() {
        let a = offer_id(
            Provider::Aws,
            "AWS  Certification   Voucher",
            "https://aws.amazon.com/deal ",
        );
        let b = offer_id(
            Provider::Aws,
            "aws certification voucher",
            "https://aws.amazon.com/deal",
        );
        let c = offer_id(
            Provider::Azure,
            "aws certification voucher",
            "https://aws.amazon.com/deal",
        );

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 16);
    }

    #[test]
    fn expiry_follows_max_age() {
        let as_of = Utc::now();
        let result = search_hit(
            "Salesforce Trailhead voucher 2025",
            "Discount code inside.",
            "https://trailhead.salesforce.com/promo",
        );

        let offers = normalizer(2025).normalize(&[result], as_of);

        assert_eq!(offers[0].discovered_at, as_of);
        assert_eq!(offers[0].expires_at, as_of + Duration::days(30));
    }
}
