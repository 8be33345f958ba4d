use chrono::{DateTime, Utc};

use dealradar_common::{Offer, UserProfile};

/// Rank the offers a user should see. Expired offers are ineligible no
/// matter how well they score, and a preferred provider restricts the set
/// rather than boosting it. The sort is a total order (confidence desc,
/// discovery time desc, offer id asc) so repeated calls agree exactly.
pub fn recommend(profile: &UserProfile, offers: &[Offer], as_of: DateTime<Utc>) -> Vec<Offer> {
    let mut eligible: Vec<Offer> = offers
        .iter()
        .filter(|o| o.expires_at > as_of)
        .filter(|o| match profile.preferred_provider {
            Some(preferred) => o.provider == preferred,
            None => true,
        })
        .cloned()
        .collect();

    eligible.sort_by(|a, b| {
        b.confidence_score
            .total_cmp(&a.confidence_score)
            .then_with(|| b.discovered_at.cmp(&a.discovered_at))
            .then_with(|| a.offer_id.cmp(&b.offer_id))
    });
    eligible
}
