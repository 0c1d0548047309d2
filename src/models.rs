//! Data models shared across the harvesting pipeline.
//!
//! - [`RangeSpec`]: parsed range token (`1`, `+3`, `-2`, `2-5`)
//! - [`FetchPlan`]: seed URL classified and paired with a range
//! - [`FetchTask`]: one admitted media download
//! - [`BlogRecord`]: fields extracted from one blog entry
//! - [`RunSummary`]: counts reported at the end of a run

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// How pages or entries are walked from the seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TraversalMode {
    /// Only the seed itself.
    One,
    /// Follow "next" links or increasing page indices.
    Forward,
    /// Follow "previous" links or decreasing page indices.
    Backward,
    /// An explicit, inclusive range of one-based page numbers.
    ClosedRange,
    Invalid,
}

impl fmt::Display for TraversalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TraversalMode::One => "one",
            TraversalMode::Forward => "forward",
            TraversalMode::Backward => "backward",
            TraversalMode::ClosedRange => "range",
            TraversalMode::Invalid => "invalid",
        };
        f.write_str(name)
    }
}

/// A parsed range token.
///
/// `steps` is `[1]` for [`TraversalMode::One`], the hop or page count for
/// `Forward`/`Backward`, every page number of the range (ascending, both ends
/// included) for `ClosedRange` and empty for `Invalid`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeSpec {
    pub mode: TraversalMode,
    pub steps: Vec<u32>,
}

impl RangeSpec {
    pub fn invalid() -> Self {
        Self { mode: TraversalMode::Invalid, steps: Vec::new() }
    }

    pub fn is_valid(&self) -> bool {
        self.mode != TraversalMode::Invalid
    }

    /// Hop count for `Forward`/`Backward` specs.
    pub fn magnitude(&self) -> u32 {
        self.steps.first().copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanKind {
    /// A single entry's detail page.
    SingleItem,
    /// A member listing page carrying a `page=<n>` index.
    PageListing,
}

impl fmt::Display for PlanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanKind::SingleItem => f.write_str("single item"),
            PlanKind::PageListing => f.write_str("page listing"),
        }
    }
}

/// Seed URL classified by the resolver. Immutable once built; enumeration
/// refuses plans with `valid == false`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchPlan {
    pub kind: PlanKind,
    pub base_url: String,
    pub range: RangeSpec,
    pub valid: bool,
}

impl FetchPlan {
    pub fn invalid(base_url: &str) -> Self {
        Self {
            kind: PlanKind::SingleItem,
            base_url: base_url.to_string(),
            range: RangeSpec::invalid(),
            valid: false,
        }
    }
}

/// One admitted download, owned by the media task that performs it.
#[derive(Debug, Clone)]
pub struct FetchTask {
    /// Id of the blog entry the download belongs to.
    pub id: usize,
    pub target_url: String,
    pub save_path: PathBuf,
}

/// Fields extracted from one blog entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlogRecord {
    pub title: String,
    pub author: String,
    /// Date label exactly as displayed, trimmed (e.g. `2018/05/01 12:00`).
    pub raw_date: String,
    pub body_text: String,
    /// Absolute image URLs in order of first appearance.
    pub media_urls: Vec<String>,
}

impl BlogRecord {
    /// Contents of the entry's text file.
    pub fn to_text(&self) -> String {
        format!("{}\n{}\n{}", self.title, self.raw_date, self.body_text)
    }
}

/// Outcome of one run, written as JSON when a report path is given.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub seed_url: String,
    pub range_token: String,
    pub items_discovered: usize,
    pub items_completed: usize,
    pub items_failed: usize,
    pub media_downloaded: usize,
    pub media_failed: usize,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_spec_magnitude() {
        let spec = RangeSpec { mode: TraversalMode::Forward, steps: vec![3] };
        assert_eq!(spec.magnitude(), 3);
        assert!(spec.is_valid());
        assert_eq!(RangeSpec::invalid().magnitude(), 0);
        assert!(!RangeSpec::invalid().is_valid());
    }

    #[test]
    fn test_invalid_plan() {
        let plan = FetchPlan::invalid("http://example.com/nowhere");
        assert!(!plan.valid);
        assert_eq!(plan.range.mode, TraversalMode::Invalid);
        assert_eq!(plan.base_url, "http://example.com/nowhere");
    }

    #[test]
    fn test_blog_record_text_layout() {
        let record = BlogRecord {
            title: "Hello".to_string(),
            author: "Member".to_string(),
            raw_date: "2018/05/01 12:00".to_string(),
            body_text: "line one\nline two".to_string(),
            media_urls: vec![],
        };
        assert_eq!(record.to_text(), "Hello\n2018/05/01 12:00\nline one\nline two");
    }

    #[test]
    fn test_run_summary_serialization() {
        let now = Local::now();
        let summary = RunSummary {
            seed_url: "http://example.com/s/k46o/diary/detail/1".to_string(),
            range_token: "1".to_string(),
            items_discovered: 1,
            items_completed: 1,
            items_failed: 0,
            media_downloaded: 2,
            media_failed: 1,
            started_at: now,
            finished_at: now,
        };

        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("\"media_failed\":1"));
        let back: RunSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(back.items_discovered, 1);
    }

    #[test]
    fn test_display_names() {
        assert_eq!(TraversalMode::ClosedRange.to_string(), "range");
        assert_eq!(PlanKind::SingleItem.to_string(), "single item");
    }
}
