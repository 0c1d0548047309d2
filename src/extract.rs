//! Field extraction from a fetched blog entry.
//!
//! The body is cleaned with a handful of regex substitutions rather than a
//! DOM walk. Image tags are reduced to their `src` URL on a line of its own,
//! every other tag becomes a line break and whitespace runs collapse. This is
//! best effort: unusual or malformed markup may leave stray fragments behind.

use crate::models::BlogRecord;
use crate::site::Site;
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

static IMG_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?is)<img\b[^>]*?\bsrc\s*=\s*["']([^"']*)["'][^>]*>"#).unwrap());
static ANY_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());
static BLANK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}").unwrap());

/// Extract a [`BlogRecord`] from an entry's detail page.
pub fn extract(html: &str, site: &Site) -> BlogRecord {
    let document = Html::parse_document(html);

    let body_markup = document
        .select(&site.body)
        .next()
        .map(|body| body.inner_html())
        .unwrap_or_default();
    let purified = purify(&body_markup);
    let media_urls = site
        .media_url
        .find_iter(&purified)
        .map(|m| m.as_str().to_string())
        .unique()
        .collect();

    BlogRecord {
        title: first_text(&document, &site.title),
        author: first_text(&document, &site.author),
        raw_date: first_text(&document, &site.date),
        body_text: merge_lines(&purified),
        media_urls,
    }
}

/// Strip markup from a body fragment, keeping image URLs as plain lines.
pub fn purify(markup: &str) -> String {
    let images = IMG_TAG.replace_all(markup, "\n$1\n");
    let text = ANY_TAG.replace_all(&images, "\n");
    decode_entities(&text)
}

/// Collapse every run of two or more whitespace characters into one line
/// break and trim the ends.
pub fn merge_lines(text: &str) -> String {
    BLANK_RUN.replace_all(text.trim(), "\n").into_owned()
}

/// Folder name for an entry: the date label with `/`, space and `:` replaced
/// by `-` (`2018/05/01 12:00` becomes `2018-05-01-12-00`).
pub fn folder_name(raw_date: &str) -> String {
    raw_date.trim().replace(['/', ' ', ':'], "-")
}

fn first_text(document: &Html, selector: &Selector) -> String {
    document
        .select(selector)
        .next()
        .map(|node| node.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
