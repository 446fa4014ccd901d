// src/ingest/providers/mod.rs
//! Feed normalizer: raw payload + source → `RawItem`s, dispatched by `SourceKind`.

pub mod feed_xml;
pub mod fr_api;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use metrics::{counter, histogram};
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::OffsetDateTime;

use crate::errors::ParseError;
use crate::ingest::types::{RawItem, Source, SourceKind};

pub const NO_TITLE: &str = "(no title)";

/// Normalize with `now` as the fallback timestamp for undated entries.
pub fn normalize(raw: &str, source: &Source) -> Result<Vec<RawItem>, ParseError> {
    normalize_at(raw, source, Utc::now())
}

pub fn normalize_at(
    raw: &str,
    source: &Source,
    now: DateTime<Utc>,
) -> Result<Vec<RawItem>, ParseError> {
    let t0 = std::time::Instant::now();
    let out = match source.kind {
        SourceKind::Rss => feed_xml::parse_feed(raw, source, now)?,
        SourceKind::JsonFrApi => fr_api::parse_documents(raw, source, now)?,
    };
    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("ingest_parse_ms").record(ms);
    counter!("ingest_items_total").increment(out.len() as u64);
    Ok(out)
}

fn from_offset(dt: OffsetDateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(dt.unix_timestamp(), dt.nanosecond())
}

/// Lenient date parsing. Returns `None` ("no date") instead of failing.
///
/// Accepts RFC 3339, RFC 2822 (incl. obsolete zones like `EST`), `YYYY-MM-DD`
/// and offset-less `YYYY-MM-DDTHH:MM:SS`; the last two are read as UTC.
pub fn parse_date(input: &str) -> Option<DateTime<Utc>> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }
    if let Some(dt) = OffsetDateTime::parse(s, &Rfc3339).ok().and_then(from_offset) {
        return Some(dt);
    }
    if let Some(dt) = OffsetDateTime::parse(s, &Rfc2822).ok().and_then(from_offset) {
        return Some(dt);
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Fall back to a placeholder when the title is missing or blank.
pub(crate) fn title_or_placeholder(title: Option<&str>) -> String {
    match title.map(str::trim) {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => NO_TITLE.to_string(),
    }
}
