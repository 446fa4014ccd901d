// tests/common/mod.rs
// Shared fixtures: a scripted transport and source builders.
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use law_tracker::config::{FetchSettings, PipelineSettings};
use law_tracker::errors::FetchError;
use law_tracker::ingest::fetch::{Fetcher, HttpResponse, HttpTransport, SequentialFallback};
use law_tracker::ingest::types::{Region, Source, SourceKind};
use law_tracker::Pipeline;

#[derive(Clone, Debug)]
pub enum Reply {
    Ok {
        body: String,
        content_type: Option<String>,
    },
    Status(u16),
    /// Answer with `body` after `delay`.
    Slow { delay: Duration, body: String },
}

impl Reply {
    pub fn xml(body: &str) -> Self {
        Reply::Ok {
            body: body.to_string(),
            content_type: Some("application/rss+xml; charset=utf-8".into()),
        }
    }

    pub fn json(body: &str) -> Self {
        Reply::Ok {
            body: body.to_string(),
            content_type: Some("application/json".into()),
        }
    }
}

/// URL → reply table; unknown URLs answer 404. Every call is recorded.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: HashMap<String, Reply>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, url: &str, reply: Reply) -> Self {
        self.routes.insert(url.to_string(), reply);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
        self.calls.lock().unwrap().push(url.to_string());
        let reply = self.routes.get(url).cloned().unwrap_or(Reply::Status(404));
        match reply {
            Reply::Ok { body, content_type } => Ok(HttpResponse {
                status: 200,
                content_type,
                body,
            }),
            Reply::Status(status) => Ok(HttpResponse {
                status,
                content_type: None,
                body: String::new(),
            }),
            Reply::Slow { delay, body } => {
                tokio::time::sleep(delay).await;
                Ok(HttpResponse {
                    status: 200,
                    content_type: None,
                    body,
                })
            }
        }
    }
}

pub fn source(id: &str, region: Region, kind: SourceKind, url: &str) -> Source {
    Source {
        id: id.to_string(),
        region,
        name: id.to_uppercase(),
        kind,
        url: url.to_string(),
        enabled: true,
    }
}

/// No proxies: every source is exactly one candidate.
pub fn direct_settings() -> FetchSettings {
    FetchSettings {
        primary_proxies: Vec::new(),
        fallback_proxies: Vec::new(),
        ..FetchSettings::default()
    }
}

pub fn pipeline(
    transport: Arc<ScriptedTransport>,
    fetch: FetchSettings,
    settings: PipelineSettings,
) -> Pipeline {
    let policy = Arc::new(SequentialFallback::from_settings(&fetch));
    Pipeline::new(Fetcher::new(transport, policy, fetch), settings)
}

pub fn fixture(name: &str) -> String {
    std::fs::read_to_string(format!("tests/fixtures/{name}")).expect("fixture")
}
