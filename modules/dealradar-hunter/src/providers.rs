use dealradar_common::Provider;

/// Static profile for one certification provider: the keyword set that
/// resolves raw hits to it, the official domains that earn the higher
/// source-reliability tier, and the canned offers served when search is
/// unavailable. Kept as data so adding a provider is additive.
pub struct ProviderProfile {
    pub provider: Provider,
    pub keywords: &'static [&'static str],
    pub domains: &'static [&'static str],
    pub fallback_offers: &'static [FallbackOffer],
}

/// One canned entry in the fallback catalog.
pub struct FallbackOffer {
    pub title: &'static str,
    pub snippet: &'static str,
    pub url: &'static str,
}

pub const PROFILES: &[ProviderProfile] = &[
    ProviderProfile {
        provider: Provider::Aws,
        keywords: &["aws", "amazon web services"],
        domains: &["aws.amazon.com", "skillbuilder.aws"],
        fallback_offers: &[FallbackOffer {
            title: "AWS Certified Solutions Architect exam voucher",
            snippet: "Save $30 on the Solutions Architect Associate exam with an \
                      AWS Skill Builder voucher. Free retake included.",
            url: "https://aws.amazon.com/certification/",
        }],
    },
    ProviderProfile {
        provider: Provider::Azure,
        keywords: &["azure", "microsoft"],
        domains: &["microsoft.com", "learn.microsoft.com"],
        fallback_offers: &[FallbackOffer {
            title: "Microsoft Azure Fundamentals free exam offer",
            snippet: "Complete the Microsoft Learn cloud skills challenge and earn a \
                      free AZ-900 certification exam voucher.",
            url: "https://learn.microsoft.com/certifications/",
        }],
    },
    ProviderProfile {
        provider: Provider::GoogleCloud,
        keywords: &["google cloud", "gcp"],
        domains: &["cloud.google.com"],
        fallback_offers: &[FallbackOffer {
            title: "Google Cloud certification discount",
            snippet: "Save $50 on Professional-level Google Cloud certification exams \
                      with the current learning-path promo code.",
            url: "https://cloud.google.com/learn/certification",
        }],
    },
    ProviderProfile {
        provider: Provider::Databricks,
        keywords: &["databricks"],
        domains: &["databricks.com"],
        fallback_offers: &[FallbackOffer {
            title: "Databricks certification challenge",
            snippet: "Join the Databricks learning festival challenge for a 50% off \
                      certification exam voucher.",
            url: "https://www.databricks.com/learn/certification",
        }],
    },
    ProviderProfile {
        provider: Provider::Salesforce,
        keywords: &["salesforce", "trailhead"],
        domains: &["salesforce.com", "trailhead.salesforce.com"],
        fallback_offers: &[FallbackOffer {
            title: "Salesforce certification voucher quest",
            snippet: "Trailhead quest participants can earn a free Salesforce \
                      certification voucher on completion.",
            url: "https://trailhead.salesforce.com/",
        }],
    },
];

/// Resolve a raw hit to a provider by keyword matching against the title,
/// then the snippet, then the URL host. First match wins; the pass order
/// means a title mention always beats a hosting domain.
pub fn resolve_provider(title: &str, snippet: &str, url: &str) -> Provider {
    let title = title.to_lowercase();
    let snippet = snippet.to_lowercase();
    let host = host_of(url).unwrap_or_default();

    for field in [title.as_str(), snippet.as_str(), host.as_str()] {
        for profile in PROFILES {
            if profile.keywords.iter().any(|kw| field.contains(kw)) {
                return profile.provider;
            }
        }
    }
    Provider::Unknown
}

/// Whether a URL is hosted on any provider's official domain.
pub fn official_domain(url: &str) -> bool {
    let host = match host_of(url) {
        Some(h) => h,
        None => return false,
    };
    PROFILES.iter().any(|profile| {
        profile
            .domains
            .iter()
            .any(|d| host == *d || host.ends_with(&format!(".{d}")))
    })
}

fn host_of(url: &str) -> Option<String> {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
}
