//! Test doubles and fixture constructors shared by unit tests across the
//! crate. Compiled for tests and for downstream crates via the
//! `test-support` feature; never part of a release build.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use dealradar_common::{Offer, Provider, SearchResult, UserProfile};

use crate::fallback::FallbackSource;
use crate::normalize::offer_id;
use crate::search::{SearchError, WebSearcher};
use crate::store::{OfferStore, Result as StoreResult, StoreError};

// --- Fixtures ---

pub fn search_hit(title: &str, snippet: &str, url: &str) -> SearchResult {
    SearchResult {
        url: url.to_string(),
        title: title.to_string(),
        snippet: snippet.to_string(),
    }
}

/// A well-formed offer with a deterministic id, expiring 30 days out.
pub fn offer(
    provider: Provider,
    title: &str,
    url: &str,
    confidence: f32,
    as_of: DateTime<Utc>,
) -> Offer {
    Offer {
        offer_id: offer_id(provider, title, url),
        provider,
        title: title.to_string(),
        snippet: format!("{title} details"),
        source_url: url.to_string(),
        discount: None,
        confidence_score: confidence,
        discovered_at: as_of,
        expires_at: as_of + chrono::Duration::days(30),
    }
}

pub fn profile(user_id: &str) -> UserProfile {
    UserProfile::new(user_id)
}

// --- MockSearcher ---

/// Scripted `WebSearcher`. Each call consumes the next scripted response;
/// an exhausted script answers `Unavailable` so a runaway retry loop fails
/// loudly instead of hanging.
#[derive(Default)]
pub struct MockSearcher {
    script: Mutex<VecDeque<Result<Vec<SearchResult>, SearchError>>>,
    calls: Mutex<u32>,
    delay: Option<Duration>,
}

impl MockSearcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then_ok(self, hits: Vec<SearchResult>) -> Self {
        self.script.lock().unwrap().push_back(Ok(hits));
        self
    }

    pub fn then_err(self, err: SearchError) -> Self {
        self.script.lock().unwrap().push_back(Err(err));
        self
    }

    /// Sleep this long inside every call, for exercising budget timeouts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> u32 {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl WebSearcher for MockSearcher {
    async fn search(
        &self,
        _query: &str,
        _max_results: usize,
    ) -> Result<Vec<SearchResult>, SearchError> {
        *self.calls.lock().unwrap() += 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.script.lock().unwrap().pop_front().unwrap_or_else(|| {
            Err(SearchError::Unavailable(
                "MockSearcher: script exhausted".to_string(),
            ))
        })
    }
}

// --- MockFallback ---

/// Canned `FallbackSource` that records how often it was consulted.
pub struct MockFallback {
    results: Vec<SearchResult>,
    calls: Mutex<u32>,
}

impl MockFallback {
    pub fn new(results: Vec<SearchResult>) -> Self {
        Self {
            results,
            calls: Mutex::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl FallbackSource for MockFallback {
    async fn fetch(&self, _providers: &[Provider]) -> Vec<SearchResult> {
        *self.calls.lock().unwrap() += 1;
        self.results.clone()
    }
}

// --- MockOfferStore ---

#[derive(Default)]
struct Inner {
    offers: HashMap<String, Offer>,
    profiles: HashMap<String, UserProfile>,
    fail_all_puts: bool,
    fail_put_titles: HashSet<String>,
}

/// In-memory `OfferStore` with switchable write failures for exercising
/// partial-batch behavior.
#[derive(Default)]
pub struct MockOfferStore {
    inner: Mutex<Inner>,
}

impl MockOfferStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `put_offer` fails.
    pub fn failing_puts(self) -> Self {
        self.inner.lock().unwrap().fail_all_puts = true;
        self
    }

    /// `put_offer` fails for offers with exactly this title.
    pub fn failing_put_titled(self, title: &str) -> Self {
        self.inner
            .lock()
            .unwrap()
            .fail_put_titles
            .insert(title.to_string());
        self
    }

    // Assertion helpers

    pub fn offers_stored(&self) -> usize {
        self.inner.lock().unwrap().offers.len()
    }

    pub fn has_offer_titled(&self, title: &str) -> bool {
        self.offer_by_title(title).is_some()
    }

    pub fn offer_by_title(&self, title: &str) -> Option<Offer> {
        self.inner
            .lock()
            .unwrap()
            .offers
            .values()
            .find(|o| o.title == title)
            .cloned()
    }

    pub fn offer_by_id(&self, offer_id: &str) -> Option<Offer> {
        self.inner.lock().unwrap().offers.get(offer_id).cloned()
    }

    pub fn profile_stored(&self, user_id: &str) -> Option<UserProfile> {
        self.inner.lock().unwrap().profiles.get(user_id).cloned()
    }
}

#[async_trait]
impl OfferStore for MockOfferStore {
    async fn get_offer(&self, offer_id: &str) -> StoreResult<Option<Offer>> {
        Ok(self.inner.lock().unwrap().offers.get(offer_id).cloned())
    }

    async fn put_offer(&self, offer: &Offer) -> StoreResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_all_puts || inner.fail_put_titles.contains(&offer.title) {
            return Err(StoreError::Other(anyhow::anyhow!(
                "MockOfferStore: write refused for {:?}",
                offer.title
            )));
        }
        inner.offers.insert(offer.offer_id.clone(), offer.clone());
        Ok(())
    }

    async fn active_offers(&self, as_of: DateTime<Utc>) -> StoreResult<Vec<Offer>> {
        let inner = self.inner.lock().unwrap();
        let mut offers: Vec<Offer> = inner
            .offers
            .values()
            .filter(|o| o.expires_at > as_of)
            .cloned()
            .collect();
        offers.sort_by(|a, b| b.discovered_at.cmp(&a.discovered_at));
        Ok(offers)
    }

    async fn reap_expired(&self, as_of: DateTime<Utc>) -> StoreResult<u64> {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.offers.len();
        inner.offers.retain(|_, o| o.expires_at > as_of);
        Ok((before - inner.offers.len()) as u64)
    }

    async fn get_profile(&self, user_id: &str) -> StoreResult<Option<UserProfile>> {
        Ok(self.inner.lock().unwrap().profiles.get(user_id).cloned())
    }

    async fn put_profile(&self, profile: &UserProfile) -> StoreResult<()> {
        self.inner
            .lock()
            .unwrap()
            .profiles
            .insert(profile.user_id.clone(), profile.clone());
        Ok(())
    }
}
