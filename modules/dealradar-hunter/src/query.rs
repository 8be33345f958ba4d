/// Topic substituted when the caller supplies none.
const DEFAULT_TOPIC: &str = "certification deals";

/// Terms appended to every query to bias results toward current promotions.
const INTENT_TERMS: &str = "discount voucher challenge";

/// Build the search query for a discovery cycle. A blank or missing topic
/// falls back to the default; the intent terms and year token are always
/// appended. Pure, no failure mode.
pub fn build_query(topic: Option<&str>, year: i32) -> String {
    let topic = match topic {
        Some(t) if !t.trim().is_empty() => t.trim(),
        _ => DEFAULT_TOPIC,
    };
    format!("{topic} {INTENT_TERMS} {year}")
}
