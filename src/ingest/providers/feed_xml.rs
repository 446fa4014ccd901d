// src/ingest/providers/feed_xml.rs
//! RSS 2.0 / RDF / Atom normalization over a streaming quick-xml reader.
//!
//! Elements are matched by local name, so `dc:date` is seen as `date` and
//! `atom:link` as `link`. Each child element of an entry records its full text
//! content (descendants included), in document order.

use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::{parse_date, title_or_placeholder};
use crate::errors::ParseError;
use crate::ingest::types::{RawItem, Source};

#[derive(Debug, Default)]
struct RawEntry {
    // (local name, text content) in start-tag order.
    fields: Vec<(String, String)>,
    // href of the first `link` element carrying one.
    href: Option<String>,
}

impl RawEntry {
    fn first(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// First occurrence of `name`, treated as absent when empty.
    fn non_empty(&self, name: &str) -> Option<&str> {
        self.first(name).filter(|v| !v.is_empty())
    }

    fn first_non_blank(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(_, v)| v.trim())
            .find(|v| !v.is_empty())
    }

    fn date(&self, name: &str) -> Option<DateTime<Utc>> {
        self.first(name).and_then(parse_date)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    Atom,
    Rss,
}

struct OpenEntry {
    kind: EntryKind,
    depth: usize,
    entry: RawEntry,
    open_fields: Vec<usize>,
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn href_of(e: &BytesStart<'_>) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == b"href")
        .map(|a| match a.unescape_value() {
            Ok(v) => v.into_owned(),
            Err(_) => String::from_utf8_lossy(&a.value).into_owned(),
        })
}

/// Parse an RSS or Atom document. Atom wins when `feed > entry` exists.
pub fn parse_feed(
    raw: &str,
    source: &Source,
    now: DateTime<Utc>,
) -> Result<Vec<RawItem>, ParseError> {
    let xml = scrub_html_entities_for_xml(raw);
    let mut reader = Reader::from_str(&xml);

    let mut path: Vec<String> = Vec::new();
    let mut open: Option<OpenEntry> = None;
    let mut atom: Vec<RawEntry> = Vec::new();
    let mut rss: Vec<RawEntry> = Vec::new();
    let mut saw_root = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                saw_root = true;
                let name = local_name(&e);
                match open.as_mut() {
                    Some(cur) => {
                        if name == "link" && cur.entry.href.is_none() {
                            cur.entry.href = href_of(&e);
                        }
                        cur.open_fields.push(cur.entry.fields.len());
                        cur.entry.fields.push((name.clone(), String::new()));
                    }
                    None => {
                        let parent = path.last().map(String::as_str);
                        let kind = match (name.as_str(), parent) {
                            ("entry", Some("feed")) => Some(EntryKind::Atom),
                            ("item", _) => Some(EntryKind::Rss),
                            _ => None,
                        };
                        if let Some(kind) = kind {
                            open = Some(OpenEntry {
                                kind,
                                depth: path.len(),
                                entry: RawEntry::default(),
                                open_fields: Vec::new(),
                            });
                        }
                    }
                }
                path.push(name);
            }
            Event::Empty(e) => {
                saw_root = true;
                if let Some(cur) = open.as_mut() {
                    let name = local_name(&e);
                    if name == "link" && cur.entry.href.is_none() {
                        cur.entry.href = href_of(&e);
                    }
                    cur.entry.fields.push((name, String::new()));
                }
            }
            Event::End(_) => {
                path.pop();
                let closes_entry = open.as_ref().is_some_and(|cur| cur.depth == path.len());
                if closes_entry {
                    if let Some(done) = open.take() {
                        match done.kind {
                            EntryKind::Atom => atom.push(done.entry),
                            EntryKind::Rss => rss.push(done.entry),
                        }
                    }
                } else if let Some(cur) = open.as_mut() {
                    cur.open_fields.pop();
                }
            }
            Event::Text(t) => {
                if let Some(cur) = open.as_mut() {
                    let text = match t.unescape() {
                        Ok(s) => s.into_owned(),
                        Err(_) => String::from_utf8_lossy(&t).into_owned(),
                    };
                    append_text(cur, &text);
                }
            }
            Event::CData(c) => {
                if let Some(cur) = open.as_mut() {
                    let text = String::from_utf8_lossy(&c.into_inner()).into_owned();
                    append_text(cur, &text);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_root {
        return Err(ParseError::Xml("document has no root element".to_string()));
    }

    let items = if !atom.is_empty() {
        atom.iter().map(|e| atom_item(e, source, now)).collect()
    } else {
        rss.iter().map(|e| rss_item(e, source, now)).collect()
    };
    Ok(items)
}

fn append_text(cur: &mut OpenEntry, text: &str) {
    for &idx in &cur.open_fields {
        cur.entry.fields[idx].1.push_str(text);
    }
}

fn atom_item(e: &RawEntry, source: &Source, now: DateTime<Utc>) -> RawItem {
    let link = e
        .href
        .as_deref()
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .unwrap_or(source.url.as_str())
        .to_string();
    let summary = e
        .non_empty("summary")
        .or_else(|| e.non_empty("content"))
        .unwrap_or_default()
        .to_string();
    RawItem {
        source: source.name.clone(),
        source_id: source.id.clone(),
        region: source.region,
        title: title_or_placeholder(e.first("title")),
        link,
        summary,
        published_at: Some(
            e.date("updated")
                .or_else(|| e.date("published"))
                .unwrap_or(now),
        ),
        document_type: None,
    }
}

fn rss_item(e: &RawEntry, source: &Source, now: DateTime<Utc>) -> RawItem {
    RawItem {
        source: source.name.clone(),
        source_id: source.id.clone(),
        region: source.region,
        title: title_or_placeholder(e.first("title")),
        link: e.first_non_blank("link").unwrap_or(source.url.as_str()).to_string(),
        summary: e.first("description").unwrap_or_default().to_string(),
        published_at: Some(e.date("pubDate").or_else(|| e.date("date")).unwrap_or(now)),
        document_type: None,
    }
}

/// Replace HTML-only entities that would make an XML parser reject the document.
pub(crate) fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&hellip;", "...")
}
