use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use dealradar_common::{Offer, Provider, UserProfile};
use dealradar_hunter::matcher::recommend;
use dealradar_hunter::pipeline::DiscoveryRequest;
use dealradar_hunter::trends::analyze;

use crate::AppState;

/// Hard cap on offers per recommendation response.
const RECOMMEND_LIMIT: usize = 5;

// --- Request and response bodies ---

#[derive(Debug, Default, Deserialize)]
pub struct DiscoverBody {
    #[serde(default)]
    topic: Option<String>,
    /// Provider tokens; unrecognized ones are dropped rather than rejected.
    #[serde(default)]
    providers: Vec<String>,
}

#[derive(Debug, Serialize)]
struct RecommendationsBody {
    offers: Vec<OfferView>,
}

/// The slice of an offer exposed to clients. Internal fields like the
/// snippet and expiry stay server-side.
#[derive(Debug, Serialize)]
struct OfferView {
    provider: Provider,
    title: String,
    source_url: String,
    discount: Option<String>,
    confidence_score: f32,
    discovered_at: DateTime<Utc>,
}

impl From<Offer> for OfferView {
    fn from(offer: Offer) -> Self {
        Self {
            provider: offer.provider,
            title: offer.title,
            source_url: offer.source_url,
            discount: offer.discount,
            confidence_score: offer.confidence_score,
            discovered_at: offer.discovered_at,
        }
    }
}

// --- Helpers ---

fn parse_providers(tokens: &[String]) -> Vec<Provider> {
    tokens
        .iter()
        .map(|t| Provider::from_token(t))
        .filter(|p| *p != Provider::Unknown)
        .collect()
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

// --- Handlers ---

pub async fn api_discover(
    State(state): State<Arc<AppState>>,
    body: Option<Json<DiscoverBody>>,
) -> impl IntoResponse {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let request = DiscoveryRequest {
        topic: body.topic,
        providers: parse_providers(&body.providers),
    };

    match state.pipeline.run(&request, Utc::now()).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(e) => {
            warn!(error = %e, "Discovery cycle failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "discovery failed")
        }
    }
}

pub async fn api_recommendations(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    let profile = match state.store.get_profile(&user_id).await {
        Ok(Some(profile)) => profile,
        Ok(None) => return error_response(StatusCode::NOT_FOUND, "unknown user"),
        Err(e) => {
            warn!(error = %e, user_id = %user_id, "Profile lookup failed");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "profile lookup failed");
        }
    };

    let as_of = Utc::now();
    let active = match state.store.active_offers(as_of).await {
        Ok(offers) => offers,
        Err(e) => {
            warn!(error = %e, user_id = %user_id, "Offer lookup failed");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "offer lookup failed");
        }
    };

    let offers: Vec<OfferView> = recommend(&profile, &active, as_of)
        .into_iter()
        .take(RECOMMEND_LIMIT)
        .map(OfferView::from)
        .collect();
    (StatusCode::OK, Json(RecommendationsBody { offers })).into_response()
}

pub async fn api_save_profile(
    State(state): State<Arc<AppState>>,
    Json(profile): Json<UserProfile>,
) -> impl IntoResponse {
    if profile.user_id.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "user_id is required");
    }

    match state.store.put_profile(&profile).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => {
            warn!(error = %e, user_id = %profile.user_id, "Profile write failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "profile write failed")
        }
    }
}

pub async fn api_trends(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let as_of = Utc::now();
    match state.store.active_offers(as_of).await {
        Ok(offers) => (StatusCode::OK, Json(analyze(&offers, as_of))).into_response(),
        Err(e) => {
            warn!(error = %e, "Offer lookup failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "offer lookup failed")
        }
    }
}
