//! Per-entry download pipeline.
//!
//! Each entry URL becomes one task in the `items` group: fetch the page,
//! extract the record, create `<output>/<author>/<date>/`, download the
//! entry's images through a nested `media` group, then write
//! `<date>.txt`. The text file is written only after every image task has
//! finished, so its presence marks an entry that was fully processed.

use crate::config::Settings;
use crate::error::{HarvestError, Result};
use crate::extract::{extract, folder_name};
use crate::fetch::HttpClient;
use crate::models::FetchTask;
use crate::orchestrator::{BatchReport, TaskGroup};
use crate::site::Site;
use crate::utils::{distinct_file_names, media_file_name, safe_path_component};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tracing::{info, instrument};

/// Image counts for one finished entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ItemOutcome {
    pub media_saved: usize,
    pub media_failed: usize,
}

#[derive(Debug)]
pub struct Harvester {
    client: HttpClient,
    site: Arc<Site>,
    output_dir: PathBuf,
    items_limit: usize,
    media_limit: usize,
}

impl Harvester {
    pub fn new(client: HttpClient, site: Arc<Site>, settings: &Settings) -> Self {
        Self {
            client,
            site,
            output_dir: PathBuf::from(&settings.output_dir),
            items_limit: settings.concurrency.items,
            media_limit: settings.concurrency.media,
        }
    }

    /// Process every entry, at most `items` at a time.
    #[instrument(level = "info", skip_all, fields(entries = urls.len()))]
    pub async fn run(self: &Arc<Self>, urls: Vec<String>) -> BatchReport<ItemOutcome> {
        info!(count = urls.len(), "There are {} blogs", urls.len());
        TaskGroup::new("items", self.items_limit)
            .run(urls, |id, url| {
                let harvester = Arc::clone(self);
                async move { harvester.harvest_item(id, url).await }
            })
            .await
    }

    /// Fetch, extract and persist one entry.
    pub async fn harvest_item(&self, id: usize, url: String) -> Result<ItemOutcome> {
        info!(task = id, %url, "Fetching entry");
        let html = self.client.get_text(&url).await?;
        let record = extract(&html, &self.site);

        let folder = match folder_name(&record.raw_date) {
            name if name.is_empty() => "undated".to_string(),
            name => safe_path_component(&name),
        };
        let author = match safe_path_component(&record.author) {
            name if name.is_empty() => "unknown".to_string(),
            name => name,
        };
        let dir = self.output_dir.join(&author).join(&folder);
        fs::create_dir_all(&dir).await?;
        info!(task = id, %author, %folder, images = record.media_urls.len(), "Extracted entry");

        let extension = &self.site.config.media_extension;
        let file_names = distinct_file_names(
            record
                .media_urls
                .iter()
                .enumerate()
                .map(|(i, url)| media_file_name(url).unwrap_or_else(|| format!("media-{}.{extension}", i + 1)))
                .collect(),
        );
        let downloads: Vec<(String, String)> = record.media_urls.iter().cloned().zip(file_names).collect();

        let media = TaskGroup::new("media", self.media_limit)
            .run(downloads, |index, (media_url, file_name)| {
                let client = self.client.clone();
                let task = FetchTask { id, target_url: media_url, save_path: dir.join(&file_name) };
                async move {
                    info!(task = task.id, media = index, file = %file_name, "Download started");
                    let bytes = client.download(&task).await?;
                    info!(task = task.id, media = index, file = %file_name, bytes, "Download done");
                    Ok::<_, HarvestError>(bytes)
                }
            })
            .await;

        let text_path = dir.join(format!("{folder}.txt"));
        fs::write(&text_path, record.to_text()).await?;

        let outcome = ItemOutcome { media_saved: media.succeeded(), media_failed: media.failed() };
        info!(
            task = id,
            saved = outcome.media_saved,
            failed = outcome.media_failed,
            path = %text_path.display(),
            "Entry all done"
        );
        Ok(outcome)
    }
}
