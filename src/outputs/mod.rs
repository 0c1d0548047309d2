//! Output written alongside the downloaded entries.
//!
//! - [`report`]: JSON summary of a run (`--report <path>`)

pub mod report;
