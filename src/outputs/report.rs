//! JSON run report.
//!
//! The report is a single pretty-printed [`RunSummary`]:
//!
//! ```text
//! {
//!   "seed_url": "http://www.keyakizaka46.com/s/k46o/artist/20?ima=0000",
//!   "range_token": "1-3",
//!   "items_discovered": 60,
//!   "items_completed": 59,
//!   ...
//! }
//! ```

use crate::harvest::ItemOutcome;
use crate::models::RunSummary;
use crate::orchestrator::BatchReport;
use chrono::{DateTime, Local};
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{error, info, instrument};

impl RunSummary {
    /// Summarize an item batch. `report` is `None` when nothing was enumerated.
    pub fn new(
        seed_url: &str,
        range_token: &str,
        started_at: DateTime<Local>,
        report: Option<&BatchReport<ItemOutcome>>,
    ) -> Self {
        let (discovered, completed, failed, media_downloaded, media_failed) = match report {
            Some(report) => (
                report.submitted,
                report.succeeded(),
                report.failed(),
                report.completed.iter().map(|(_, o)| o.media_saved).sum::<usize>(),
                report.completed.iter().map(|(_, o)| o.media_failed).sum::<usize>(),
            ),
            None => (0, 0, 0, 0, 0),
        };

        Self {
            seed_url: seed_url.to_string(),
            range_token: range_token.to_string(),
            items_discovered: discovered,
            items_completed: completed,
            items_failed: failed,
            media_downloaded,
            media_failed,
            started_at,
            finished_at: Local::now(),
        }
    }
}

/// Write `summary` as pretty JSON to `path`, creating parent directories.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_report(summary: &RunSummary, path: &Path) -> Result<(), Box<dyn Error>> {
    let json = serde_json::to_string_pretty(summary)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = fs::create_dir_all(parent).await {
            error!(parent = %parent.display(), error = %e, "Failed to create report dir");
            return Err(e.into());
        }
    }

    fs::write(path, json).await?;
    info!("Wrote run report");
    Ok(())
}
