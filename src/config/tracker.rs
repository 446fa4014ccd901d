// src/config/tracker.rs
use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf, time::Duration};

pub const ENV_CONFIG_PATH: &str = "LAW_TRACKER_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config/law_tracker.toml";

fn default_timeout_ms() -> u64 {
    8_000
}
fn default_backoff_ms() -> u64 {
    300
}
fn default_user_agent() -> String {
    "law-tracker/0.1 (+regulatory news aggregator)".to_string()
}
fn default_primary_proxies() -> Vec<String> {
    [
        "https://corsproxy.io/?",
        "https://api.allorigins.win/get?url=",
        "https://r.jina.ai/http://",
    ]
    .map(String::from)
    .to_vec()
}
fn default_fallback_proxies() -> Vec<String> {
    [
        "https://api.corsproxy.io/?",
        "https://thingproxy.freeboard.io/fetch/",
        "https://cors.bridged.cc/",
        "https://api.codetabs.com/v1/proxy?quest=",
        "https://cors-anywhere.herokuapp.com/",
    ]
    .map(String::from)
    .to_vec()
}
fn default_batch_size() -> usize {
    3
}
fn default_pacing_ms() -> u64 {
    600
}
fn default_deadline_ms() -> u64 {
    8_000
}

/// `[fetch]` section: per-attempt timeout, backoff and the proxy chains.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FetchSettings {
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_primary_proxies")]
    pub primary_proxies: Vec<String>,
    #[serde(default = "default_fallback_proxies")]
    pub fallback_proxies: Vec<String>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            backoff_ms: default_backoff_ms(),
            user_agent: default_user_agent(),
            primary_proxies: default_primary_proxies(),
            fallback_proxies: default_fallback_proxies(),
        }
    }
}

impl FetchSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

/// `[pipeline]` section: batching, pacing and the run deadline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineSettings {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,
    #[serde(default = "default_deadline_ms")]
    pub deadline_ms: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            pacing_ms: default_pacing_ms(),
            deadline_ms: default_deadline_ms(),
        }
    }
}

impl PipelineSettings {
    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TrackerConfig {
    #[serde(default)]
    pub fetch: FetchSettings,
    #[serde(default)]
    pub pipeline: PipelineSettings,
}

impl TrackerConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading tracker config at {}", path.display()))?;
        Self::from_toml_str(&data)
    }

    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        let mut cfg: TrackerConfig = toml::from_str(s).context("parsing tracker config")?;
        cfg.sanitize();
        Ok(cfg)
    }

    /// Resolve `$LAW_TRACKER_CONFIG`, then `config/law_tracker.toml`, then defaults.
    pub fn load_default() -> anyhow::Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            return Self::load_from_file(pb);
        }
        let pb = PathBuf::from(DEFAULT_CONFIG_PATH);
        if pb.exists() {
            return Self::load_from_file(pb);
        }
        Ok(Self::default())
    }

    fn sanitize(&mut self) {
        if self.pipeline.batch_size == 0 {
            self.pipeline.batch_size = default_batch_size();
        }
        if self.fetch.timeout_ms == 0 {
            self.fetch.timeout_ms = default_timeout_ms();
        }
        self.fetch.primary_proxies.retain(|p| !p.trim().is_empty());
        self.fetch.fallback_proxies.retain(|p| !p.trim().is_empty());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let cfg = TrackerConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, TrackerConfig::default());
        assert_eq!(cfg.pipeline.batch_size, 3);
        assert_eq!(cfg.pipeline.deadline(), Duration::from_secs(8));
        assert_eq!(cfg.fetch.backoff(), Duration::from_millis(300));
        assert_eq!(cfg.fetch.primary_proxies.len(), 3);
        assert_eq!(cfg.fetch.fallback_proxies.len(), 5);
    }

    #[test]
    fn partial_sections_keep_other_defaults_and_sanitize() {
        let cfg = TrackerConfig::from_toml_str(
            r#"
[pipeline]
batch_size = 0
pacing_ms = 50

[fetch]
timeout_ms = 0
primary_proxies = ["", "https://proxy.example/?u="]
"#,
        )
        .unwrap();
        assert_eq!(cfg.pipeline.batch_size, 3);
        assert_eq!(cfg.pipeline.pacing_ms, 50);
        assert_eq!(cfg.pipeline.deadline_ms, 8_000);
        assert_eq!(cfg.fetch.timeout_ms, 8_000);
        assert_eq!(cfg.fetch.primary_proxies, vec!["https://proxy.example/?u="]);
    }
}
