// src/ingest/fetch.rs
//! Resilient fetcher: one resource, an ordered chain of candidate URLs (direct first,
//! then proxy-wrapped), a per-attempt deadline and a fixed backoff between attempts.

use async_trait::async_trait;
use metrics::counter;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::FetchSettings;
use crate::errors::FetchError;
use crate::ingest::types::{Source, SourceKind};

const FEED_ACCEPT: &str =
    "application/rss+xml, application/xml, text/xml, application/atom+xml, application/json";

/// Fields of a JSON proxy envelope that carry the wrapped body, in priority order.
const ENVELOPE_FIELDS: [&str; 3] = ["contents", "body", "result"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

/// Minimal GET abstraction so fetch policies can be exercised without a network.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, url: &str) -> Result<HttpResponse, FetchError>;
}

pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(settings: &FetchSettings) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.as_str())
            .connect_timeout(settings.timeout())
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
        let resp = self.client.get(url).header(ACCEPT, FEED_ACCEPT).send().await?;
        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);
        let body = resp.text().await?;
        Ok(HttpResponse {
            status,
            content_type,
            body,
        })
    }
}

/// Strategy for turning a candidate chain into one payload.
#[async_trait]
pub trait FetchPolicy: Send + Sync {
    async fn fetch(
        &self,
        transport: &dyn HttpTransport,
        candidates: &[String],
    ) -> Result<String, FetchError>;
}

/// Try candidates strictly in order; the first non-empty payload wins.
#[derive(Debug, Clone, Copy)]
pub struct SequentialFallback {
    pub timeout: Duration,
    pub backoff: Duration,
}

impl SequentialFallback {
    pub fn new(timeout: Duration, backoff: Duration) -> Self {
        Self { timeout, backoff }
    }

    pub fn from_settings(settings: &FetchSettings) -> Self {
        Self::new(settings.timeout(), settings.backoff())
    }

    async fn attempt(&self, transport: &dyn HttpTransport, url: &str) -> Result<String, FetchError> {
        let resp = match tokio::time::timeout(self.timeout, transport.get(url)).await {
            Ok(r) => r?,
            Err(_) => return Err(FetchError::Timeout(self.timeout.as_millis() as u64)),
        };
        if !(200..300).contains(&resp.status) {
            return Err(FetchError::Status(resp.status));
        }
        let text = extract_payload(resp.content_type.as_deref(), resp.body);
        if text.trim().is_empty() {
            return Err(FetchError::EmptyBody);
        }
        Ok(text)
    }
}

#[async_trait]
impl FetchPolicy for SequentialFallback {
    async fn fetch(
        &self,
        transport: &dyn HttpTransport,
        candidates: &[String],
    ) -> Result<String, FetchError> {
        for (i, url) in candidates.iter().enumerate() {
            counter!("fetch_attempts_total").increment(1);
            match self.attempt(transport, url).await {
                Ok(text) => {
                    debug!(target: "ingest", attempt = i + 1, %url, bytes = text.len(), "fetch ok");
                    return Ok(text);
                }
                Err(e) => {
                    counter!("fetch_failures_total").increment(1);
                    debug!(target: "ingest", attempt = i + 1, %url, error = %e, "fetch attempt failed");
                    if i + 1 < candidates.len() {
                        tokio::time::sleep(self.backoff).await;
                    }
                }
            }
        }
        counter!("fetch_exhausted_total").increment(1);
        let resource = candidates.first().cloned().unwrap_or_default();
        warn!(target: "ingest", %resource, attempts = candidates.len(), "all candidates failed");
        Err(FetchError::Exhausted {
            resource,
            attempts: candidates.len(),
        })
    }
}

/// Unwrap JSON proxy envelopes (`contents` / `body` / `result`); anything else is the raw body.
pub fn extract_payload(content_type: Option<&str>, body: String) -> String {
    let is_json = content_type
        .map(|ct| ct.to_ascii_lowercase().contains("application/json"))
        .unwrap_or(false);
    if !is_json {
        return body;
    }
    let Ok(value) = serde_json::from_str::<serde_json::Value>(&body) else {
        return body;
    };
    for field in ENVELOPE_FIELDS {
        if let Some(s) = value.get(field).and_then(|v| v.as_str()) {
            if !s.is_empty() {
                return s.to_string();
            }
        }
    }
    body
}

/// Ordered candidate chain for a source: the URL itself, then (RSS only) every
/// primary proxy, then every fallback proxy, each wrapping the encoded URL.
pub fn candidate_urls(source: &Source, settings: &FetchSettings) -> Vec<String> {
    let mut out = vec![source.url.clone()];
    if source.kind == SourceKind::JsonFrApi {
        return out;
    }
    let encoded: String = url::form_urlencoded::byte_serialize(source.url.as_bytes()).collect();
    out.extend(
        settings
            .primary_proxies
            .iter()
            .chain(settings.fallback_proxies.iter())
            .map(|prefix| format!("{prefix}{encoded}")),
    );
    out
}

/// Transport + policy + proxy settings, shared by every source of a run.
#[derive(Clone)]
pub struct Fetcher {
    transport: Arc<dyn HttpTransport>,
    policy: Arc<dyn FetchPolicy>,
    settings: FetchSettings,
}

impl Fetcher {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        policy: Arc<dyn FetchPolicy>,
        settings: FetchSettings,
    ) -> Self {
        Self {
            transport,
            policy,
            settings,
        }
    }

    /// Real network transport with the sequential fallback policy.
    pub fn from_settings(settings: FetchSettings) -> Result<Self, FetchError> {
        let transport = Arc::new(ReqwestTransport::new(&settings)?);
        let policy = Arc::new(SequentialFallback::from_settings(&settings));
        Ok(Self::new(transport, policy, settings))
    }

    pub async fn fetch_source(&self, source: &Source) -> Result<String, FetchError> {
        let candidates = candidate_urls(source, &self.settings);
        self.policy.fetch(self.transport.as_ref(), &candidates).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::Region;

    fn rss_source(url: &str) -> Source {
        Source {
            id: "t".into(),
            region: Region::Us,
            name: "T".into(),
            kind: SourceKind::Rss,
            url: url.into(),
            enabled: true,
        }
    }

    #[test]
    fn envelope_fields_follow_priority() {
        let ct = Some("application/json; charset=utf-8");
        assert_eq!(
            extract_payload(ct, r#"{"body":"b","contents":"c"}"#.into()),
            "c"
        );
        assert_eq!(extract_payload(ct, r#"{"contents":"","result":"r"}"#.into()), "r");
        let raw = r#"{"results":[1,2]}"#.to_string();
        assert_eq!(extract_payload(ct, raw.clone()), raw);
        assert_eq!(extract_payload(ct, "not json".into()), "not json");
        assert_eq!(
            extract_payload(Some("text/xml"), r#"{"contents":"c"}"#.into()),
            r#"{"contents":"c"}"#
        );
    }

    #[test]
    fn rss_candidates_wrap_encoded_url_in_order() {
        let settings = FetchSettings {
            primary_proxies: vec!["https://p1/?".into()],
            fallback_proxies: vec!["https://f1/fetch/".into(), "https://f2/?q=".into()],
            ..FetchSettings::default()
        };
        let c = candidate_urls(&rss_source("https://a.example/rss?x=1"), &settings);
        assert_eq!(
            c,
            vec![
                "https://a.example/rss?x=1".to_string(),
                "https://p1/?https%3A%2F%2Fa.example%2Frss%3Fx%3D1".to_string(),
                "https://f1/fetch/https%3A%2F%2Fa.example%2Frss%3Fx%3D1".to_string(),
                "https://f2/?q=https%3A%2F%2Fa.example%2Frss%3Fx%3D1".to_string(),
            ]
        );
    }

    #[test]
    fn api_sources_are_fetched_directly() {
        let mut s = rss_source("https://www.federalregister.gov/api/v1/documents.json");
        s.kind = SourceKind::JsonFrApi;
        assert_eq!(candidate_urls(&s, &FetchSettings::default()).len(), 1);
    }
}
