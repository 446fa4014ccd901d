// src/ingest/providers/fr_api.rs
//! Federal Register documents API (`/api/v1/documents.json`).

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use super::{parse_date, title_or_placeholder};
use crate::errors::ParseError;
use crate::ingest::types::{RawItem, Source};

const LINK_FIELDS: [&str; 4] = ["html_url", "pdf_url", "public_inspection_pdf_url", "url"];

fn text<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    obj.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// Map each object of the top-level `results` array; non-objects are skipped.
pub fn parse_documents(
    raw: &str,
    source: &Source,
    now: DateTime<Utc>,
) -> Result<Vec<RawItem>, ParseError> {
    let doc: Value = serde_json::from_str(raw)?;
    let Some(results) = doc.get("results").and_then(Value::as_array) else {
        return Ok(Vec::new());
    };

    let items = results
        .iter()
        .filter_map(Value::as_object)
        .map(|r| {
            let published_at = text(r, "publication_date")
                .and_then(parse_date)
                .or_else(|| text(r, "signing_date").and_then(parse_date))
                .unwrap_or(now);
            RawItem {
                source: source.name.clone(),
                source_id: source.id.clone(),
                region: source.region,
                title: title_or_placeholder(text(r, "title")),
                link: LINK_FIELDS
                    .iter()
                    .find_map(|k| text(r, k))
                    .unwrap_or_default()
                    .to_string(),
                summary: text(r, "abstract")
                    .or_else(|| text(r, "title"))
                    .unwrap_or_default()
                    .to_string(),
                published_at: Some(published_at),
                document_type: text(r, "document_type").map(ToString::to_string),
            }
        })
        .collect();
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::{Region, SourceKind};
    use chrono::TimeZone;

    fn src() -> Source {
        Source {
            id: "sec_fr_api".into(),
            region: Region::Us,
            name: "Federal Register – SEC".into(),
            kind: SourceKind::JsonFrApi,
            url: "https://www.federalregister.gov/api/v1/documents.json".into(),
            enabled: true,
        }
    }

    #[test]
    fn maps_fields_with_fallbacks() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let json = r#"{
  "count": 4,
  "results": [
    {"title": "Proposed Rule: Amendments to Regulation S-K",
     "abstract": "The Commission is proposing amendments.",
     "html_url": "https://www.federalregister.gov/d/2024-01",
     "pdf_url": "https://govinfo.gov/x.pdf",
     "publication_date": "2024-05-01",
     "document_type": "Proposed Rule"},
    {"title": "Notice", "abstract": null,
     "pdf_url": "https://govinfo.gov/y.pdf",
     "signing_date": "2024-04-02"},
    42,
    {"abstract": "untitled record"}
  ]
}"#;
        let items = parse_documents(json, &src(), now).unwrap();
        assert_eq!(items.len(), 3);

        assert_eq!(items[0].link, "https://www.federalregister.gov/d/2024-01");
        assert_eq!(items[0].summary, "The Commission is proposing amendments.");
        assert_eq!(items[0].document_type.as_deref(), Some("Proposed Rule"));
        assert_eq!(
            items[0].published_at,
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap())
        );

        assert_eq!(items[1].summary, "Notice", "abstract falls back to title");
        assert_eq!(items[1].link, "https://govinfo.gov/y.pdf");
        assert_eq!(
            items[1].published_at,
            Some(Utc.with_ymd_and_hms(2024, 4, 2, 0, 0, 0).unwrap())
        );

        assert_eq!(items[2].title, "(no title)");
        assert_eq!(items[2].link, "");
        assert_eq!(items[2].published_at, Some(now));
    }

    #[test]
    fn missing_results_is_empty_and_invalid_json_fails() {
        let now = Utc::now();
        assert!(parse_documents(r#"{"count":0}"#, &src(), now)
            .unwrap()
            .is_empty());
        assert!(matches!(
            parse_documents("<html>", &src(), now),
            Err(ParseError::Json(_))
        ));
    }
}
