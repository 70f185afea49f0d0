//! Parser for the `|||`-delimited record grammar.
//!
//! Batched enrichment responses carry one record per line:
//! - Topics: `name|||description|||videoId`
//! - Documents: `title|||description|||link`
//!
//! No schema is enforced by the service, so anything that does not yield
//! three non-empty fields (or a usable link) is dropped.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use roadmapper_shared::{DocumentHit, TopicEnrichment};

/// Field separator used by the record grammar.
pub const FIELD_SEPARATOR: &str = "|||";

/// Base for watch links built from a bare video id.
const VIDEO_BASE: &str = "https://www.youtube.com/watch?v=";

/// Leading list decoration models like to add (`- `, `* `, `1. `, `2) `).
static LIST_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:[-*•]|\d+[.)])\s+").expect("list prefix regex"));

/// A bare video id.
static VIDEO_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{6,20}$").expect("video id regex"));

/// Split a line into exactly three trimmed, non-empty fields.
///
/// Extra fields beyond the third are ignored. The first field is returned
/// as written; see [`strip_list_prefix`].
pub fn split_record(line: &str) -> Option<(&str, &str, &str)> {
    let mut fields = line.split(FIELD_SEPARATOR).map(str::trim);
    let first = fields.next().filter(|s| !s.is_empty())?;
    let second = fields.next().filter(|s| !s.is_empty())?;
    let third = fields.next().filter(|s| !s.is_empty())?;
    Some((first, second, third))
}

/// Remove a leading list marker (`- `, `* `, `1. `, `2) `) from a field.
pub fn strip_list_prefix(field: &str) -> &str {
    LIST_PREFIX_RE
        .find(field)
        .map_or(field, |m| &field[m.end()..])
}

/// Parse topic records into a map keyed by topic name.
///
/// A name that exactly matches one of `requested` is kept verbatim, so a
/// topic really called `1. Basics` stays under that key. Any other name has
/// its list decoration removed. A later record for the same topic replaces
/// an earlier one.
pub fn parse_topic_records(text: &str, requested: &[String]) -> HashMap<String, TopicEnrichment> {
    let mut out = HashMap::new();
    for line in text.lines() {
        let Some((raw_topic, description, video)) = split_record(line) else {
            continue;
        };
        let topic = if requested.iter().any(|t| t == raw_topic) {
            raw_topic
        } else {
            strip_list_prefix(raw_topic)
        };
        if topic.is_empty() {
            continue;
        }
        let Some(reference_link) = video_link(video) else {
            tracing::debug!(topic, video, "dropping record with unusable video id");
            continue;
        };
        out.insert(
            topic.to_string(),
            TopicEnrichment {
                description: description.to_string(),
                reference_link,
            },
        );
    }
    out
}

/// Parse document records, keeping only those with an http(s) link.
pub fn parse_document_records(text: &str) -> Vec<DocumentHit> {
    text.lines()
        .filter_map(split_record)
        .filter_map(|(title, summary, link)| {
            let title = strip_list_prefix(title);
            let url = Url::parse(link).ok()?;
            matches!(url.scheme(), "http" | "https").then(|| DocumentHit {
                title: title.to_string(),
                summary: summary.to_string(),
                url: url.to_string(),
            })
        })
        .collect()
}

/// Turn a bare id (or an already complete URL) into a watch link.
fn video_link(raw: &str) -> Option<String> {
    let raw = raw.trim_matches(|c| c == '"' || c == '\'');
    if let Ok(url) = Url::parse(raw) {
        return matches!(url.scheme(), "http" | "https").then(|| url.to_string());
    }
    VIDEO_ID_RE
        .is_match(raw)
        .then(|| format!("{VIDEO_BASE}{raw}"))
}
