//! Command-line interface definitions.
//!
//! The seed URL and range token can be given as flags; whichever is missing
//! is asked for on stdin.

use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

/// Usage examples printed before prompting.
pub const USAGE_EXAMPLES: &str = "\
A blog URL and a range token
---------Example-----------
[URL Single Page]
http://www.keyakizaka46.com/s/k46o/diary/detail/15117?ima=0000&cd=member

[URL Page Index]
http://www.keyakizaka46.com/s/k46o/diary/member/list?ima=0000&page=1&cd=member&ct=20

[URL Profile Page]
http://www.keyakizaka46.com/s/k46o/artist/20?ima=0000

[Range Token]
1 current page or entry | +4 / -6 next or previous | 1-5 a range of pages
---------------------------";

/// Command-line arguments.
///
/// # Examples
///
/// ```sh
/// # Prompt for everything
/// blog_harvest
///
/// # Three listing pages of one member, eight images at a time
/// blog_harvest -u 'http://www.keyakizaka46.com/s/k46o/artist/20?ima=0000' -r 1-3 --media 8
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Seed URL: an entry, a member listing page or a member profile
    #[arg(short, long)]
    pub url: Option<String>,

    /// Range token: 1, +N, -N or A-B
    #[arg(short, long, allow_hyphen_values = true)]
    pub range: Option<String>,

    /// Path to a YAML configuration file
    #[arg(short, long, env = "BLOG_HARVEST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory under which <author>/<date>/ folders are created
    #[arg(short, long)]
    pub output_dir: Option<String>,

    /// Entries processed concurrently
    #[arg(long)]
    pub items: Option<usize>,

    /// Images downloaded concurrently per entry
    #[arg(long)]
    pub media: Option<usize>,

    /// Write a JSON run summary to this path
    #[arg(long)]
    pub report: Option<PathBuf>,
}

/// Print `label`, read one line from `input` and return it trimmed.
pub fn prompt_line(label: &str, input: &mut impl BufRead) -> io::Result<String> {
    print!("{label}");
    io::stdout().flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim().to_string())
}
