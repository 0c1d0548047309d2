//! Runtime configuration loaded from an optional YAML file.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! configuration for the Keyakizaka46 member diary. A typical override:
//!
//! ```yaml
//! output_dir: ./blogs
//! concurrency:
//!   items: 2
//!   media: 8
//! fetch:
//!   timeout_secs: 15
//! ```

use crate::error::{HarvestError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, instrument};

/// Ceiling on `items × media`, the peak number of requests in flight when the
/// media group runs nested inside the item group.
pub const MAX_NESTED_CONCURRENCY: usize = 256;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Root under which `<author>/<date>/` folders are created.
    pub output_dir: String,
    pub fetch: FetchConfig,
    pub concurrency: ConcurrencyConfig,
    pub site: SiteConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_dir: ".".to_string(),
            fetch: FetchConfig::default(),
            concurrency: ConcurrencyConfig::default(),
            site: SiteConfig::default(),
        }
    }
}

/// HTTP client settings shared by every request.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/62.0.3202.94 Safari/537.36".to_string(),
        }
    }
}

/// Limits for the two nested task groups.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConcurrencyConfig {
    /// Blog entries processed at once.
    pub items: usize,
    /// Images downloaded at once within a single entry.
    pub media: usize,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self { items: 4, media: 4 }
    }
}

impl ConcurrencyConfig {
    /// Worst-case number of concurrent downloads.
    pub fn peak(&self) -> usize {
        self.items.saturating_mul(self.media)
    }
}

/// URL shapes and selectors of the diary site.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Every seed URL must start with this.
    pub root: String,
    /// Relative links are resolved against this.
    pub origin: String,
    pub profile_marker: String,
    pub listing_marker: String,
    pub detail_marker: String,
    /// Path, relative to the part of a profile URL before the profile marker,
    /// of the member listing.
    pub listing_path: String,
    /// Query of the member listing; `{member}` is replaced by the member code.
    pub profile_listing_query: String,
    /// Appended to listing URLs that carry no page index.
    pub listing_default_suffix: String,
    pub item_link_selector: String,
    pub next_link_selector: String,
    pub prev_link_selector: String,
    pub title_selector: String,
    pub author_selector: String,
    pub date_selector: String,
    pub body_selector: String,
    /// File extension (without dot) of the images to download.
    pub media_extension: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            root: "http://www.keyakizaka46.com/s/k46o".to_string(),
            origin: "http://www.keyakizaka46.com".to_string(),
            profile_marker: "artist".to_string(),
            listing_marker: "diary/member".to_string(),
            detail_marker: "diary/detail".to_string(),
            listing_path: "diary/member/list".to_string(),
            profile_listing_query: "ima=0000&ct={member}&cd=member&page=0".to_string(),
            listing_default_suffix: "&cd=member&page=0".to_string(),
            item_link_selector: "article .box-bottom".to_string(),
            next_link_selector: ".btn-next a".to_string(),
            prev_link_selector: ".btn-prev a".to_string(),
            title_selector: "article .box-ttl h3".to_string(),
            author_selector: "article .name".to_string(),
            date_selector: "article .box-bottom li".to_string(),
            body_selector: "article .box-article".to_string(),
            media_extension: "jpg".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from `path`, or the defaults when no path is given.
    #[instrument(level = "info", skip_all, fields(path = ?path))]
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let settings = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| {
                    HarvestError::Config(format!("cannot read {}: {e}", path.display()))
                })?;
                Self::from_yaml(&raw)?
            }
            None => Self::default(),
        };
        info!(
            items = settings.concurrency.items,
            media = settings.concurrency.media,
            timeout_secs = settings.fetch.timeout_secs,
            "Loaded configuration"
        );
        Ok(settings)
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Reject limits that are zero or whose nested product exceeds
    /// [`MAX_NESTED_CONCURRENCY`].
    pub fn validate(&self) -> Result<()> {
        let c = &self.concurrency;
        if c.items == 0 || c.media == 0 {
            return Err(HarvestError::Config(format!(
                "concurrency limits must be positive (items = {}, media = {})",
                c.items, c.media
            )));
        }
        if c.peak() > MAX_NESTED_CONCURRENCY {
            return Err(HarvestError::Config(format!(
                "items ({}) × media ({}) allows {} concurrent downloads; keep it at or below {}",
                c.items,
                c.media,
                c.peak(),
                MAX_NESTED_CONCURRENCY
            )));
        }
        if self.fetch.timeout_secs == 0 {
            return Err(HarvestError::Config("timeout_secs must be positive".to_string()));
        }
        Ok(())
    }
}
