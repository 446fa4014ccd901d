// src/ingest/registry.rs
//! Immutable catalog of fetchable sources.
//!
//! Every mutation (`toggle`, `add_custom`, `ensure_region_enabled`) returns a new
//! registry; callers swap the whole value between runs.

use std::collections::HashSet;
use std::sync::Arc;

use crate::errors::RunError;
use crate::ingest::types::{Region, Source, SourceKind};

const FR_API_MARKER: &str = "federalregister.gov/api";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRegistry {
    sources: Arc<Vec<Source>>,
}

impl SourceRegistry {
    /// Build a registry, rejecting duplicate ids.
    pub fn new(sources: Vec<Source>) -> Result<Self, RunError> {
        let mut seen = HashSet::with_capacity(sources.len());
        for s in &sources {
            if !seen.insert(s.id.as_str()) {
                return Err(RunError::DuplicateSourceId(s.id.clone()));
            }
        }
        Ok(Self {
            sources: Arc::new(sources),
        })
    }

    /// Built-in presets: e-Gov, FSA, SEC, Federal Register, ESMA, EBA.
    pub fn presets() -> Self {
        Self {
            sources: Arc::new(preset_sources()),
        }
    }

    pub fn all(&self) -> &[Source] {
        &self.sources
    }

    pub fn get(&self, id: &str) -> Option<&Source> {
        self.sources.iter().find(|s| s.id == id)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn for_region(&self, region: Region) -> Vec<&Source> {
        self.sources.iter().filter(|s| s.region == region).collect()
    }

    /// Enabled sources of `region`, in registry order.
    pub fn active_for(&self, region: Region) -> Vec<Source> {
        self.sources
            .iter()
            .filter(|s| s.enabled && s.region == region)
            .cloned()
            .collect()
    }

    /// Flip `enabled` on `id`, returning the new registry and the updated source.
    /// `None` if the id is unknown.
    pub fn toggle(&self, id: &str) -> Option<(Self, Source)> {
        let mut toggled = self.get(id)?.clone();
        toggled.enabled = !toggled.enabled;
        let next = self
            .sources
            .iter()
            .map(|s| if s.id == id { toggled.clone() } else { s.clone() })
            .collect();
        Some((
            Self {
                sources: Arc::new(next),
            },
            toggled,
        ))
    }

    /// Prepend a user-supplied source. The kind is guessed from the URL and the id
    /// is a fresh uuid, so the result can never collide with an existing id.
    pub fn add_custom(&self, url: &str, region: Region) -> (Self, Source) {
        let url = url.trim().to_string();
        let (kind, name) = guess_kind(&url);
        let added = Source {
            id: uuid::Uuid::new_v4().to_string(),
            region,
            name: name.to_string(),
            kind,
            url,
            enabled: true,
        };
        let mut next = Vec::with_capacity(self.sources.len() + 1);
        next.push(added.clone());
        next.extend(self.sources.iter().cloned());
        (
            Self {
                sources: Arc::new(next),
            },
            added,
        )
    }

    /// If every source of `region` is disabled, re-enable all of them.
    /// Returns `None` when nothing needs to change.
    pub fn ensure_region_enabled(&self, region: Region) -> Option<Self> {
        let list = self.for_region(region);
        if list.is_empty() || list.iter().any(|s| s.enabled) {
            return None;
        }
        let next = self
            .sources
            .iter()
            .map(|s| {
                let mut s = s.clone();
                if s.region == region {
                    s.enabled = true;
                }
                s
            })
            .collect();
        Some(Self {
            sources: Arc::new(next),
        })
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::presets()
    }
}

fn guess_kind(url: &str) -> (SourceKind, &'static str) {
    if url.to_ascii_lowercase().contains(FR_API_MARKER) {
        (SourceKind::JsonFrApi, "Federal Register – Custom")
    } else {
        (SourceKind::Rss, "Custom RSS/Atom")
    }
}

fn preset(id: &str, region: Region, name: &str, kind: SourceKind, url: &str) -> Source {
    Source {
        id: id.to_string(),
        region,
        name: name.to_string(),
        kind,
        url: url.to_string(),
        enabled: true,
    }
}

pub(crate) fn preset_sources() -> Vec<Source> {
    use Region::*;
    use SourceKind::*;
    vec![
        preset(
            "egov_pcm_list",
            Jp,
            "e-Gov 意見募集",
            Rss,
            "https://public-comment.e-gov.go.jp/rss/pcm_list.xml",
        ),
        preset(
            "fsa_news",
            Jp,
            "金融庁 新着",
            Rss,
            "https://www.fsa.go.jp/fsaNewsListAll_rss2.xml",
        ),
        preset(
            "sec_press",
            Us,
            "SEC Press",
            Rss,
            "https://www.sec.gov/news/pressreleases.rss",
        ),
        preset(
            "sec_fr_api",
            Us,
            "Federal Register – SEC",
            JsonFrApi,
            "https://www.federalregister.gov/api/v1/documents.json?per_page=40&order=newest&conditions%5Bagencies%5D%5B%5D=securities-and-exchange-commission&conditions%5Btype%5D%5B%5D=PROPOSED_RULE&conditions%5Btype%5D%5B%5D=RULE&conditions%5Btype%5D%5B%5D=NOTICE",
        ),
        preset(
            "esma_news",
            Eu,
            "ESMA News",
            Rss,
            "https://www.esma.europa.eu/rss/news",
        ),
        preset(
            "sec_filings_atom",
            Us,
            "SEC Current Filings (EDGAR)",
            Rss,
            "https://www.sec.gov/cgi-bin/browse-edgar?action=getcurrent&count=100&output=atom",
        ),
        preset(
            "egov_pcm_result",
            Jp,
            "e-Gov 結果公示",
            Rss,
            "https://public-comment.e-gov.go.jp/rss/pcm_result.xml",
        ),
        preset(
            "eba_news",
            Eu,
            "EBA News",
            Rss,
            "https://www.eba.europa.eu/rss/news",
        ),
    ]
}
