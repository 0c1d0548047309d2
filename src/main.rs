//! # Blog Harvest
//!
//! Downloads member blog entries from a paginated blog site: the entry text
//! plus every image embedded in it, stored as
//! `<output>/<author>/<date>/<date>.txt` next to the images.
//!
//! ## Usage
//!
//! ```sh
//! blog_harvest -u 'http://www.keyakizaka46.com/s/k46o/artist/20?ima=0000' -r 1-3
//! ```
//!
//! ## Architecture
//!
//! 1. **Planning**: classify the seed URL and parse the range token
//! 2. **Enumeration**: walk listing pages or sibling links to collect entry URLs
//! 3. **Harvesting**: process entries in a bounded task group, each entry
//!    downloading its images through a nested bounded group
//! 4. **Output**: per-entry text files, images and an optional JSON report

use chrono::Local;
use clap::Parser;
use std::error::Error;
use std::io;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

mod cli;
mod config;
mod enumerate;
mod error;
mod extract;
mod fetch;
mod harvest;
mod models;
mod orchestrator;
mod outputs;
mod plan;
mod range;
mod site;
mod utils;

use cli::{prompt_line, Cli, USAGE_EXAMPLES};
use config::Settings;
use enumerate::Enumerator;
use error::HarvestError;
use fetch::HttpClient;
use harvest::Harvester;
use models::RunSummary;
use outputs::report::write_report;
use site::Site;
use utils::{ensure_writable_dir, truncate_for_log};

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    let started_at = Local::now();
    info!("blog_harvest starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let settings = match load_settings(&args) {
        Ok(settings) => settings,
        Err(e) => {
            error!(error = %e, "Configuration rejected");
            return Err(e.into());
        }
    };

    // ---- Seed URL and range token ----
    if args.url.is_none() || args.range.is_none() {
        println!("{USAGE_EXAMPLES}");
    }
    let seed_url = match args.url.clone() {
        Some(url) => url.trim().to_string(),
        None => prompt_line("Blog URL: ", &mut io::stdin().lock())?,
    };
    if !plan::is_site_url(&seed_url, &settings.site) {
        error!(url = %seed_url, root = %settings.site.root, "URL is not under the blog site");
        return Err(HarvestError::InvalidInput(format!("not a blog URL: {seed_url}")).into());
    }

    let range_token = match args.range.clone() {
        Some(token) => token.trim().to_string(),
        None => prompt_line("Range: ", &mut io::stdin().lock())?,
    };

    let fetch_plan = plan::resolve(&seed_url, &range_token, &settings.site);
    if !fetch_plan.valid {
        error!(url = %seed_url, range = %range_token, "Unrecognized URL or range token");
        return Err(HarvestError::InvalidInput(format!(
            "cannot plan a fetch for {seed_url} with range {range_token:?}"
        ))
        .into());
    }
    info!(kind = %fetch_plan.kind, mode = %fetch_plan.range.mode, base = %fetch_plan.base_url, "Resolved fetch plan");

    // ---- Enumerate entries ----
    let site = Arc::new(Site::new(settings.site.clone())?);
    let client = HttpClient::new(&settings.fetch)?;
    let urls = match Enumerator::new(&client, &site).enumerate(&fetch_plan).await {
        Ok(urls) => urls,
        Err(e) if e.is_fatal() => {
            error!(error = %e, "Cannot enumerate entries");
            return Err(e.into());
        }
        Err(e) => {
            warn!(error = %e, "Enumeration stopped early");
            Vec::new()
        }
    };
    debug!(first = %truncate_for_log(urls.first().map(String::as_str).unwrap_or(""), 120), "Enumeration finished");

    // ---- Harvest ----
    let batch = if urls.is_empty() {
        warn!(url = %seed_url, range = %range_token, "no items found");
        None
    } else {
        let output_dir = Path::new(&settings.output_dir);
        if let Err(e) = ensure_writable_dir(output_dir).await {
            error!(
                path = %output_dir.display(),
                error = %e,
                "Output directory is not writable (fix perms or choose a different path)"
            );
            return Err(e);
        }

        let harvester = Arc::new(Harvester::new(client, Arc::clone(&site), &settings));
        let batch = harvester.run(urls).await;
        if batch.failed() > 0 {
            warn!(failed = batch.failed(), succeeded = batch.succeeded(), "Some entries failed");
        }
        Some(batch)
    };

    // ---- Report ----
    let summary = RunSummary::new(&seed_url, &range_token, started_at, batch.as_ref());
    if let Some(path) = args.report.as_deref() {
        write_report(&summary, path).await?;
    }

    info!(
        entries = summary.items_completed,
        failed = summary.items_failed,
        images = summary.media_downloaded,
        "Mission completed"
    );

    let elapsed = start_time.elapsed();
    info!(
        elapsed_secs = elapsed.as_secs_f64(),
        "Execution complete in {:.2?}",
        elapsed
    );
    Ok(())
}

/// Load the YAML settings and apply CLI overrides on top.
fn load_settings(args: &Cli) -> error::Result<Settings> {
    let mut settings = Settings::load(args.config.as_deref())?;
    if let Some(dir) = &args.output_dir {
        settings.output_dir = dir.clone();
    }
    if let Some(items) = args.items {
        settings.concurrency.items = items;
    }
    if let Some(media) = args.media {
        settings.concurrency.media = media;
    }
    settings.validate()?;
    Ok(settings)
}
