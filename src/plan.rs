//! Seed URL classification.
//!
//! A seed is matched against the site's markers in order: profile page,
//! member listing, entry detail. Profile pages are rewritten to the member's
//! listing at page 0 and listings without a page index get one appended, so
//! every `PageListing` plan carries a `page=<n>` parameter for the enumerator
//! to rewrite. A plan is only valid if both the URL shape and the range token
//! are recognized; nothing is fetched here.

use crate::config::SiteConfig;
use crate::enumerate::page_index;
use crate::models::{FetchPlan, PlanKind};
use crate::range;
use tracing::{debug, instrument, warn};

/// Whether the seed belongs to the configured site at all.
pub fn is_site_url(seed_url: &str, site: &SiteConfig) -> bool {
    !site.root.is_empty() && seed_url.starts_with(&site.root)
}

/// Classify `seed_url` and pair it with the parsed `range_token`.
#[instrument(level = "info", skip(site))]
pub fn resolve(seed_url: &str, range_token: &str, site: &SiteConfig) -> FetchPlan {
    let Some((kind, base_url)) = classify(seed_url, site) else {
        warn!("Seed URL matches no known page shape");
        return FetchPlan::invalid(seed_url);
    };

    let range = range::parse(range_token);
    if !range.is_valid() {
        warn!("Range token is not recognized");
        return FetchPlan::invalid(seed_url);
    }

    debug!(%kind, %base_url, mode = %range.mode, steps = ?range.steps, "Resolved fetch plan");
    FetchPlan { kind, base_url, range, valid: true }
}

fn classify(seed_url: &str, site: &SiteConfig) -> Option<(PlanKind, String)> {
    if seed_url.contains(&site.profile_marker) {
        profile_listing_url(seed_url, site).map(|url| (PlanKind::PageListing, url))
    } else if seed_url.contains(&site.listing_marker) {
        let url = if page_index(seed_url).is_some() {
            seed_url.to_string()
        } else {
            format!("{seed_url}{}", site.listing_default_suffix)
        };
        Some((PlanKind::PageListing, url))
    } else if seed_url.contains(&site.detail_marker) {
        Some((PlanKind::SingleItem, seed_url.to_string()))
    } else {
        None
    }
}

/// `<prefix>/artist/<member>?…` becomes `<prefix>/<listing_path>?<query>` with
/// the member code substituted into the query.
fn profile_listing_url(seed_url: &str, site: &SiteConfig) -> Option<String> {
    let marker = format!("/{}/", site.profile_marker.trim_matches('/'));
    let (prefix, rest) = seed_url.split_once(&marker)?;
    let member = rest.split(['?', '/', '#']).next().filter(|m| !m.is_empty())?;

    Some(format!(
        "{}/{}?{}",
        prefix.trim_end_matches('/'),
        site.listing_path.trim_matches('/'),
        site.profile_listing_query.replace("{member}", member)
    ))
}
