// src/ingest/dedup.rs
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt::Write as _;

use crate::ingest::types::RawItem;

/// Stable identity of an item: `src||link+title+summary||epoch_millis`.
///
/// Items with neither text nor timestamp get a random suffix so they are
/// never merged with one another.
pub fn identity_key(item: &RawItem) -> String {
    let src = [item.source_id.as_str(), item.source.as_str()]
        .into_iter()
        .find(|s| !s.is_empty())
        .unwrap_or("src");
    let basis = format!("{}{}{}", item.link, item.title, item.summary);
    let ts = item
        .published_at
        .map(|dt| dt.timestamp_millis().to_string())
        .unwrap_or_default();
    if basis.is_empty() && ts.is_empty() {
        return format!("{src}||||{}", uuid::Uuid::new_v4());
    }
    format!("{src}||{basis}||{ts}")
}

/// Keep the first occurrence of every identity key, preserving order.
pub fn dedupe(items: Vec<RawItem>) -> Vec<RawItem> {
    let mut seen: HashSet<String> = HashSet::with_capacity(items.len());
    items
        .into_iter()
        .filter(|it| seen.insert(identity_key(it)))
        .collect()
}

/// Short render id: first 8 bytes of SHA-256(key), hex.
pub fn item_id(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    digest[..8].iter().fold(String::with_capacity(16), |mut s, b| {
        let _ = write!(s, "{b:02x}");
        s
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::Region;
    use chrono::{TimeZone, Utc};

    fn item(src: &str, title: &str, ts: Option<i64>) -> RawItem {
        RawItem {
            source: "SEC Press".into(),
            source_id: src.into(),
            region: Region::Us,
            title: title.into(),
            link: format!("https://sec.gov/{title}"),
            summary: String::new(),
            published_at: ts.map(|s| Utc.timestamp_opt(s, 0).unwrap()),
            document_type: None,
        }
    }

    #[test]
    fn key_layout() {
        let it = item("sec_press", "a", Some(1));
        assert_eq!(identity_key(&it), "sec_press||https://sec.gov/aa||1000");
        let mut anon = item("", "a", None);
        anon.source.clear();
        assert_eq!(identity_key(&anon), "src||https://sec.gov/aa||");
    }

    #[test]
    fn degenerate_items_never_merge() {
        let blank = RawItem {
            source: "x".into(),
            source_id: "x".into(),
            region: Region::Jp,
            title: String::new(),
            link: String::new(),
            summary: String::new(),
            published_at: None,
            document_type: None,
        };
        assert!(identity_key(&blank).starts_with("x||||"));
        assert_eq!(dedupe(vec![blank.clone(), blank]).len(), 2);
    }

    #[test]
    fn dedupe_keeps_first_and_is_idempotent() {
        let a = item("s", "a", Some(10));
        let b = item("s", "b", Some(10));
        let mut a_other_source = a.clone();
        a_other_source.source_id = "t".into();
        let input = vec![a.clone(), b.clone(), a.clone(), a_other_source.clone(), b];
        let once = dedupe(input.clone());
        assert!(once.len() <= input.len());
        assert_eq!(once.len(), 3);
        assert_eq!(once[0], a);
        assert_eq!(once[2], a_other_source);
        assert_eq!(dedupe(once.clone()), once);
    }

    #[test]
    fn item_id_is_stable_hex() {
        let id = item_id("sec_press||x||1");
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(id, item_id("sec_press||x||1"));
        assert_ne!(id, item_id("sec_press||x||2"));
    }
}
