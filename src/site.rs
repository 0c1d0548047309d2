//! Compiled form of [`SiteConfig`]: parsed origin, selectors and the media
//! URL pattern, built once per run and shared read-only by every task.

use crate::config::SiteConfig;
use crate::error::{HarvestError, Result};
use regex::Regex;
use scraper::Selector;
use url::Url;

#[derive(Debug)]
pub struct Site {
    pub config: SiteConfig,
    pub origin: Url,
    /// Entry nodes on a listing page; the last anchor inside each is the link.
    pub item_link: Selector,
    pub anchor: Selector,
    pub next_link: Selector,
    pub prev_link: Selector,
    pub title: Selector,
    pub author: Selector,
    pub date: Selector,
    pub body: Selector,
    /// Absolute image URLs with the configured extension.
    pub media_url: Regex,
}

impl Site {
    pub fn new(config: SiteConfig) -> Result<Self> {
        let origin = Url::parse(&config.origin)
            .map_err(|e| HarvestError::Config(format!("invalid origin {:?}: {e}", config.origin)))?;
        let media_url = Regex::new(&format!(
            r#"https?://[^\s"'<>]+?\.{}"#,
            regex::escape(&config.media_extension)
        ))
        .map_err(|e| HarvestError::Config(format!("invalid media extension: {e}")))?;

        Ok(Self {
            origin,
            item_link: selector(&config.item_link_selector)?,
            anchor: selector("a[href]")?,
            next_link: selector(&config.next_link_selector)?,
            prev_link: selector(&config.prev_link_selector)?,
            title: selector(&config.title_selector)?,
            author: selector(&config.author_selector)?,
            date: selector(&config.date_selector)?,
            body: selector(&config.body_selector)?,
            media_url,
            config,
        })
    }

    /// Resolve a possibly relative link against the site origin.
    pub fn absolute(&self, href: &str) -> Option<String> {
        self.origin.join(href.trim()).ok().map(|u| u.to_string())
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| HarvestError::Config(format!("invalid selector {css:?}: {e}")))
}
