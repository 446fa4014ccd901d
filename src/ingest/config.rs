// src/ingest/config.rs
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::ingest::registry::SourceRegistry;
use crate::ingest::types::Source;

pub const ENV_SOURCES_PATH: &str = "LAW_TRACKER_SOURCES";
const DEFAULT_SOURCES_PATH: &str = "config/sources.toml";

/// Load a source list from an explicit path. Supports TOML (`[[sources]]`) or a JSON array.
pub fn load_sources_from(path: &Path) -> Result<SourceRegistry> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading sources from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let sources = parse_sources(&content, ext.as_str())?;
    SourceRegistry::new(sources).with_context(|| format!("validating {}", path.display()))
}

/// Load sources using env var + fallbacks:
/// 1) $LAW_TRACKER_SOURCES
/// 2) config/sources.toml
/// 3) built-in presets
pub fn load_sources_default() -> Result<SourceRegistry> {
    if let Ok(p) = std::env::var(ENV_SOURCES_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_sources_from(&pb);
        } else {
            return Err(anyhow!("{ENV_SOURCES_PATH} points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from(DEFAULT_SOURCES_PATH);
    if toml_p.exists() {
        return load_sources_from(&toml_p);
    }
    Ok(SourceRegistry::presets())
}

fn parse_sources(s: &str, hint_ext: &str) -> Result<Vec<Source>> {
    if hint_ext == "json" {
        return parse_json(s);
    }
    match parse_toml(s) {
        Ok(v) => Ok(v),
        Err(toml_err) => parse_json(s).map_err(|_| toml_err),
    }
}

fn parse_toml(s: &str) -> Result<Vec<Source>> {
    #[derive(serde::Deserialize)]
    struct TomlSources {
        sources: Vec<Source>,
    }
    let v: TomlSources = toml::from_str(s).context("parsing sources toml")?;
    Ok(clean_list(v.sources))
}

fn parse_json(s: &str) -> Result<Vec<Source>> {
    let v: Vec<Source> = serde_json::from_str(s).context("parsing sources json")?;
    Ok(clean_list(v))
}

// Trim ids/urls and drop entries without either.
fn clean_list(items: Vec<Source>) -> Vec<Source> {
    items
        .into_iter()
        .filter_map(|mut s| {
            s.id = s.id.trim().to_string();
            s.url = s.url.trim().to_string();
            if s.id.is_empty() || s.url.is_empty() {
                None
            } else {
                Some(s)
            }
        })
        .collect()
}
