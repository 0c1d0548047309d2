//! Expansion of a [`FetchPlan`] into the ordered list of entry URLs.
//!
//! Listing plans are turned into page URLs by rewriting the `page=<n>` query
//! parameter, then every page is fetched in order and its entry links are
//! concatenated. Single-entry plans with a direction follow the entry's
//! "next" or "previous" link one fetch at a time.
//!
//! A page that fails to load is logged and skipped. If all of them fail the
//! result is simply empty.

use crate::error::{HarvestError, Result};
use crate::fetch::HttpClient;
use crate::models::{FetchPlan, PlanKind, RangeSpec, TraversalMode};
use crate::site::Site;
use futures::stream::{self, StreamExt};
use once_cell::sync::Lazy;
use regex::{NoExpand, Regex};
use scraper::Html;
use tracing::{debug, info, instrument, warn};

static PAGE_PARAM: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bpage=(\d+)").unwrap());

/// Zero-based page index carried by a listing URL.
pub fn page_index(url: &str) -> Option<u32> {
    PAGE_PARAM.captures(url).and_then(|caps| caps[1].parse().ok())
}

/// `url` with its page index replaced by `index`.
pub fn with_page_index(url: &str, index: u32) -> String {
    PAGE_PARAM.replace(url, NoExpand(&format!("page={index}"))).into_owned()
}

/// Listing page URLs to visit for `range`, in visit order.
///
/// Forward and backward walks cover `magnitude + 1` pages including the
/// current one; a backward walk stops at page 0. Closed ranges are one-based,
/// so step `s` is page index `s - 1`.
pub fn listing_pages(base_url: &str, range: &RangeSpec) -> Result<Vec<String>> {
    let current = page_index(base_url)
        .ok_or_else(|| HarvestError::InvalidInput(format!("listing URL has no page index: {base_url}")))?;

    let indices: Vec<u32> = match range.mode {
        TraversalMode::One => vec![current],
        TraversalMode::Forward => (0..=range.magnitude()).filter_map(|i| current.checked_add(i)).collect(),
        TraversalMode::Backward => (0..=range.magnitude()).filter_map(|i| current.checked_sub(i)).collect(),
        TraversalMode::ClosedRange => range.steps.iter().filter_map(|s| s.checked_sub(1)).collect(),
        TraversalMode::Invalid => {
            return Err(HarvestError::InvalidInput("range token is not recognized".to_string()));
        }
    };

    Ok(indices.into_iter().map(|i| with_page_index(base_url, i)).collect())
}

/// Entry URLs on one listing page, in document order.
pub fn item_links(html: &str, site: &Site) -> Vec<String> {
    let document = Html::parse_document(html);
    document
        .select(&site.item_link)
        .filter_map(|entry| entry.select(&site.anchor).last())
        .filter_map(|anchor| anchor.value().attr("href"))
        .filter_map(|href| site.absolute(href))
        .collect()
}

/// The "next" (forward) or "previous" (backward) entry linked from a detail page.
pub fn sibling_link(html: &str, site: &Site, mode: TraversalMode) -> Option<String> {
    let selector = match mode {
        TraversalMode::Forward => &site.next_link,
        TraversalMode::Backward => &site.prev_link,
        _ => return None,
    };
    let document = Html::parse_document(html);
    document
        .select(selector)
        .find_map(|anchor| anchor.value().attr("href"))
        .filter(|href| !href.trim().is_empty())
        .and_then(|href| site.absolute(href))
}

#[derive(Debug)]
pub struct Enumerator<'a> {
    client: &'a HttpClient,
    site: &'a Site,
}

impl<'a> Enumerator<'a> {
    pub fn new(client: &'a HttpClient, site: &'a Site) -> Self {
        Self { client, site }
    }

    /// Resolve `plan` into entry URLs.
    ///
    /// Invalid plans and closed ranges on a single entry are refused before
    /// any request is made.
    #[instrument(level = "info", skip_all, fields(kind = %plan.kind, mode = %plan.range.mode, url = %plan.base_url))]
    pub async fn enumerate(&self, plan: &FetchPlan) -> Result<Vec<String>> {
        if !plan.valid {
            return Err(HarvestError::InvalidInput(format!(
                "no usable fetch plan for {}",
                plan.base_url
            )));
        }

        let urls = match (plan.kind, plan.range.mode) {
            (_, TraversalMode::Invalid) => {
                return Err(HarvestError::InvalidInput("range token is not recognized".to_string()));
            }
            (PlanKind::SingleItem, TraversalMode::One) => vec![plan.base_url.clone()],
            (PlanKind::SingleItem, TraversalMode::ClosedRange) => {
                return Err(HarvestError::ModeMismatch {
                    mode: plan.range.mode.to_string(),
                    kind: plan.kind.to_string(),
                });
            }
            (PlanKind::SingleItem, direction) => {
                self.walk_siblings(&plan.base_url, direction, plan.range.magnitude()).await
            }
            (PlanKind::PageListing, _) => {
                let pages = listing_pages(&plan.base_url, &plan.range)?;
                self.collect_items(pages).await
            }
        };

        info!(count = urls.len(), "Enumerated entry URLs");
        Ok(urls)
    }

    /// Seed first, then up to `hops` linked entries in the given direction.
    async fn walk_siblings(&self, seed: &str, direction: TraversalMode, hops: u32) -> Vec<String> {
        let mut urls = vec![seed.to_string()];
        let mut current = seed.to_string();

        for hop in 1..=hops {
            let html = match self.client.get_text(&current).await {
                Ok(html) => html,
                Err(e) => {
                    warn!(hop, url = %current, error = %e, "Entry fetch failed; stopping walk");
                    break;
                }
            };
            match sibling_link(&html, self.site, direction) {
                Some(next) => {
                    debug!(hop, url = %next, "Found linked entry");
                    urls.push(next.clone());
                    current = next;
                }
                None => {
                    info!(hop, collected = urls.len(), "No further entry link; stopping early");
                    break;
                }
            }
        }
        urls
    }

    /// Fetch listing pages one after another and concatenate their entries.
    async fn collect_items(&self, pages: Vec<String>) -> Vec<String> {
        let total = pages.len();
        let per_page: Vec<Option<Vec<String>>> = stream::iter(pages)
            .then(|page| async move {
                match self.client.get_text(&page).await {
                    Ok(html) => {
                        let items = item_links(&html, self.site);
                        debug!(%page, count = items.len(), "Listed page");
                        Some(items)
                    }
                    Err(e) => {
                        warn!(%page, error = %e, "Listing page fetch failed; skipping");
                        None
                    }
                }
            })
            .collect()
            .await;

        let failed = per_page.iter().filter(|p| p.is_none()).count();
        if total > 0 && failed == total {
            warn!(pages = total, "Every listing page failed");
        }
        per_page.into_iter().flatten().flatten().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FetchConfig, SiteConfig};
    use crate::plan::resolve;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn listing_html(ids: &[u32]) -> String {
        let entries: String = ids
            .iter()
            .map(|id| {
                format!(
                    r#"<article><div class="box-bottom"><ul><li>2018/05/01 12:00</li>
                    <li><a href="/s/k46o/diary/detail/{id}?ima=0000&amp;cd=member">個別ページ</a></li></ul></div></article>"#
                )
            })
            .collect();
        format!("<html><body>{entries}</body></html>")
    }

    fn detail_html(prev: Option<u32>, next: Option<u32>) -> String {
        let link = |class: &str, id: Option<u32>| match id {
            Some(id) => format!(r#"<p class="{class}"><a href="/s/k46o/diary/detail/{id}">link</a></p>"#),
            None => format!(r#"<p class="{class}"></p>"#),
        };
        format!(
            "<html><body><article><h3>entry</h3></article>{}{}</body></html>",
            link("btn-prev", prev),
            link("btn-next", next)
        )
    }

    fn test_site(server: &MockServer) -> Site {
        Site::new(SiteConfig {
            root: format!("{}/s/k46o", server.uri()),
            origin: server.uri(),
            ..SiteConfig::default()
        })
        .unwrap()
    }

    fn client() -> HttpClient {
        HttpClient::new(&FetchConfig { timeout_secs: 5, ..FetchConfig::default() }).unwrap()
    }

    fn listing_url(server: &MockServer, page: u32) -> String {
        format!("{}/s/k46o/diary/member/list?ima=0000&page={page}&cd=member&ct=20", server.uri())
    }

    async fn mount_listing(server: &MockServer, page: u32, ids: &[u32]) {
        Mock::given(method("GET"))
            .and(path("/s/k46o/diary/member/list"))
            .and(query_param("page", page.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_string(listing_html(ids)))
            .mount(server)
            .await;
    }

    async fn requested_pages(server: &MockServer) -> Vec<String> {
        server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .filter_map(|r| r.url.query_pairs().find(|(k, _)| k == "page").map(|(_, v)| v.into_owned()))
            .collect()
    }

    fn detail_ids(urls: &[String]) -> Vec<String> {
        urls.iter()
            .map(|u| u.split("/detail/").nth(1).unwrap().split('?').next().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_page_index_rewrite() {
        let url = "http://h/s/k46o/diary/member/list?ima=0000&page=12&cd=member&ct=20";
        assert_eq!(page_index(url), Some(12));
        assert_eq!(
            with_page_index(url, 3),
            "http://h/s/k46o/diary/member/list?ima=0000&page=3&cd=member&ct=20"
        );
        assert_eq!(page_index("http://h/list?homepage=4"), None);
    }

    #[test]
    fn test_listing_pages_forward_and_backward() {
        let base = "http://h/list?page=1&ct=20";
        let forward = listing_pages(base, &RangeSpec { mode: TraversalMode::Forward, steps: vec![2] }).unwrap();
        assert_eq!(forward, vec!["http://h/list?page=1&ct=20", "http://h/list?page=2&ct=20", "http://h/list?page=3&ct=20"]);

        let backward = listing_pages(base, &RangeSpec { mode: TraversalMode::Backward, steps: vec![3] }).unwrap();
        assert_eq!(backward, vec!["http://h/list?page=1&ct=20", "http://h/list?page=0&ct=20"]);
    }

    #[test]
    fn test_listing_pages_closed_range_is_one_based() {
        let base = "http://h/list?page=0";
        let spec = RangeSpec { mode: TraversalMode::ClosedRange, steps: vec![0, 1, 2] };
        assert_eq!(listing_pages(base, &spec).unwrap(), vec!["http://h/list?page=0", "http://h/list?page=1"]);
    }

    #[test]
    fn test_listing_without_page_is_invalid_input() {
        let spec = RangeSpec { mode: TraversalMode::One, steps: vec![1] };
        assert!(matches!(listing_pages("http://h/list?ct=20", &spec), Err(HarvestError::InvalidInput(_))));
    }

    #[test]
    fn test_item_links_use_trailing_anchor_and_origin() {
        let site = Site::new(SiteConfig::default()).unwrap();
        let html = r#"<article><div class="box-bottom"><a href="/comments/9">c</a><a href="/s/k46o/diary/detail/9">d</a></div>
            <div class="box-bottom"><a href="http://other.example.com/x">x</a></div></article>"#;
        assert_eq!(
            item_links(html, &site),
            vec!["http://www.keyakizaka46.com/s/k46o/diary/detail/9", "http://other.example.com/x"]
        );
    }

    #[test]
    fn test_sibling_link_directions() {
        let site = Site::new(SiteConfig::default()).unwrap();
        let html = detail_html(Some(4), None);
        assert_eq!(
            sibling_link(&html, &site, TraversalMode::Backward).as_deref(),
            Some("http://www.keyakizaka46.com/s/k46o/diary/detail/4")
        );
        assert_eq!(sibling_link(&html, &site, TraversalMode::Forward), None);
        assert_eq!(sibling_link(&html, &site, TraversalMode::One), None);
    }

    #[tokio::test]
    async fn test_single_item_one_fetches_nothing() {
        let server = MockServer::start().await;
        let site = test_site(&server);
        let seed = format!("{}/s/k46o/diary/detail/15117?ima=0000&cd=member", server.uri());

        let plan = resolve(&seed, "1", &site.config);
        let urls = Enumerator::new(&client(), &site).enumerate(&plan).await.unwrap();

        assert_eq!(urls, vec![seed]);
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_listing_forward_visits_pages_in_order() {
        let server = MockServer::start().await;
        mount_listing(&server, 1, &[11, 12]).await;
        mount_listing(&server, 2, &[21]).await;
        mount_listing(&server, 3, &[31, 32]).await;
        let site = test_site(&server);

        let plan = resolve(&listing_url(&server, 1), "+2", &site.config);
        let urls = Enumerator::new(&client(), &site).enumerate(&plan).await.unwrap();

        assert_eq!(requested_pages(&server).await, vec!["1", "2", "3"]);
        assert_eq!(detail_ids(&urls), vec!["11", "12", "21", "31", "32"]);
        assert!(urls[0].starts_with(&server.uri()));
    }

    #[tokio::test]
    async fn test_listing_closed_range_maps_steps_to_zero_based_pages() {
        let server = MockServer::start().await;
        mount_listing(&server, 1, &[1]).await;
        mount_listing(&server, 2, &[2]).await;
        mount_listing(&server, 3, &[3]).await;
        let site = test_site(&server);

        let plan = resolve(&listing_url(&server, 0), "2-4", &site.config);
        assert_eq!(plan.range.steps, vec![2, 3, 4]);
        let urls = Enumerator::new(&client(), &site).enumerate(&plan).await.unwrap();

        assert_eq!(requested_pages(&server).await, vec!["1", "2", "3"]);
        assert_eq!(detail_ids(&urls), vec!["1", "2", "3"]);
    }

    #[tokio::test]
    async fn test_failed_page_is_skipped() {
        let server = MockServer::start().await;
        mount_listing(&server, 0, &[1]).await;
        Mock::given(method("GET"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        mount_listing(&server, 2, &[3]).await;
        let site = test_site(&server);

        let plan = resolve(&listing_url(&server, 0), "+2", &site.config);
        let urls = Enumerator::new(&client(), &site).enumerate(&plan).await.unwrap();

        assert_eq!(detail_ids(&urls), vec!["1", "3"]);
    }

    #[tokio::test]
    async fn test_all_pages_failing_yields_empty_list() {
        let server = MockServer::start().await;
        let site = test_site(&server);

        let plan = resolve(&listing_url(&server, 4), "-1", &site.config);
        let urls = Enumerator::new(&client(), &site).enumerate(&plan).await.unwrap();

        assert!(urls.is_empty());
        assert_eq!(requested_pages(&server).await, vec!["4", "3"]);
    }

    #[tokio::test]
    async fn test_single_item_walk_stops_when_links_run_out() {
        let server = MockServer::start().await;
        for (id, next) in [(1, Some(2)), (2, Some(3)), (3, None)] {
            Mock::given(method("GET"))
                .and(path(format!("/s/k46o/diary/detail/{id}")))
                .respond_with(ResponseTemplate::new(200).set_body_string(detail_html(None, next)))
                .mount(&server)
                .await;
        }
        let site = test_site(&server);
        let seed = format!("{}/s/k46o/diary/detail/1", server.uri());

        let plan = resolve(&seed, "+5", &site.config);
        let urls = Enumerator::new(&client(), &site).enumerate(&plan).await.unwrap();

        assert_eq!(detail_ids(&urls), vec!["1", "2", "3"]);
        assert_eq!(server.received_requests().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_single_item_walk_takes_exactly_magnitude_hops() {
        let server = MockServer::start().await;
        for (id, prev) in [(9, 8), (8, 7), (7, 6)] {
            Mock::given(method("GET"))
                .and(path(format!("/s/k46o/diary/detail/{id}")))
                .respond_with(ResponseTemplate::new(200).set_body_string(detail_html(Some(prev), None)))
                .mount(&server)
                .await;
        }
        let site = test_site(&server);
        let seed = format!("{}/s/k46o/diary/detail/9", server.uri());

        let plan = resolve(&seed, "-2", &site.config);
        let urls = Enumerator::new(&client(), &site).enumerate(&plan).await.unwrap();

        assert_eq!(detail_ids(&urls), vec!["9", "8", "7"]);
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_single_item_walk_keeps_collected_entries_on_fetch_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/s/k46o/diary/detail/1"))
            .respond_with(ResponseTemplate::new(200).set_body_string(detail_html(None, Some(2))))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/s/k46o/diary/detail/2"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let site = test_site(&server);
        let seed = format!("{}/s/k46o/diary/detail/1", server.uri());

        let plan = resolve(&seed, "+4", &site.config);
        let urls = Enumerator::new(&client(), &site).enumerate(&plan).await.unwrap();

        assert_eq!(detail_ids(&urls), vec!["1", "2"]);
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_closed_range_on_single_item_is_mode_mismatch() {
        let server = MockServer::start().await;
        let site = test_site(&server);
        let seed = format!("{}/s/k46o/diary/detail/1", server.uri());

        let plan = resolve(&seed, "1-3", &site.config);
        let err = Enumerator::new(&client(), &site).enumerate(&plan).await.unwrap_err();

        assert!(matches!(err, HarvestError::ModeMismatch { .. }));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_plan_fetches_nothing() {
        let server = MockServer::start().await;
        let site = test_site(&server);
        let seed = format!("{}/s/k46o/artist/20?ima=0000", server.uri());

        let plan = resolve(&seed, "1-1", &site.config);
        assert!(!plan.valid);
        let err = Enumerator::new(&client(), &site).enumerate(&plan).await.unwrap_err();

        assert!(matches!(err, HarvestError::InvalidInput(_)));
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
