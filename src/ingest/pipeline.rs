// src/ingest/pipeline.rs
//! Batched retrieval run: fetch+normalize per source (concurrent within a batch),
//! incremental dedupe with partial snapshots, then classify → filter → sort.

use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::analyze::classify::{classify, Category};
use crate::analyze::filters::{
    is_whitepaper, matches_query, should_exclude, within_recency, DayWindow,
};
use crate::config::PipelineSettings;
use crate::errors::{RunError, SourceError};
use crate::ingest::dedup::{dedupe, identity_key, item_id};
use crate::ingest::fetch::Fetcher;
use crate::ingest::providers::normalize_at;
use crate::ingest::registry::SourceRegistry;
use crate::ingest::types::{RawItem, Region, Source};

/// What the caller asks for. `day_window` is checked when the run starts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunConfig {
    pub region: Region,
    pub day_window: u32,
    #[serde(default)]
    pub only_whitepaper: bool,
    #[serde(default)]
    pub search_query: String,
    #[serde(default)]
    pub category: Option<Category>,
}

impl RunConfig {
    pub fn new(region: Region, day_window: u32) -> Self {
        Self {
            region,
            day_window,
            only_whitepaper: false,
            search_query: String::new(),
            category: None,
        }
    }

    pub fn window(&self) -> Result<DayWindow, RunError> {
        DayWindow::try_from(self.day_window)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Fetching,
    PartialMerge,
    Finalizing,
    Done,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClassifiedItem {
    #[serde(flatten)]
    pub raw: RawItem,
    pub category: Category,
    pub id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunOutcome {
    pub items: Vec<ClassifiedItem>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    State(RunState),
    /// Deduplicated raw items accumulated so far.
    Partial(Vec<RawItem>),
    Finished(RunOutcome),
}

/// Publishes to an optional listener; `false` once the listener is gone.
struct Events<'a>(Option<&'a UnboundedSender<RunEvent>>);

impl Events<'_> {
    fn send(&self, ev: RunEvent) -> bool {
        match self.0 {
            Some(tx) => tx.send(ev).is_ok(),
            None => true,
        }
    }

    fn state(&self, state: RunState) -> bool {
        debug!(target: "pipeline", ?state, "state");
        self.send(RunEvent::State(state))
    }

    fn listening(&self) -> bool {
        self.0.map(|tx| !tx.is_closed()).unwrap_or(true)
    }
}

#[derive(Clone)]
pub struct Pipeline {
    fetcher: Fetcher,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(fetcher: Fetcher, settings: PipelineSettings) -> Self {
        Self { fetcher, settings }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub async fn run(&self, registry: &SourceRegistry, cfg: &RunConfig) -> RunOutcome {
        self.execute(registry, cfg, Events(None), Utc::now()).await
    }

    /// Same as [`Pipeline::run`] with a fixed clock for recency and undated items.
    pub async fn run_at(
        &self,
        registry: &SourceRegistry,
        cfg: &RunConfig,
        now: DateTime<Utc>,
    ) -> RunOutcome {
        self.execute(registry, cfg, Events(None), now).await
    }

    /// Streams state changes and partial snapshots to `events`. Dropping the
    /// receiver stops the run after the batch in flight.
    pub async fn run_with_events(
        &self,
        registry: &SourceRegistry,
        cfg: &RunConfig,
        events: UnboundedSender<RunEvent>,
    ) -> RunOutcome {
        self.execute(registry, cfg, Events(Some(&events)), Utc::now())
            .await
    }

    async fn execute(
        &self,
        registry: &SourceRegistry,
        cfg: &RunConfig,
        events: Events<'_>,
        now: DateTime<Utc>,
    ) -> RunOutcome {
        super::ensure_metrics_described();
        counter!("pipeline_runs_total").increment(1);
        let started = Instant::now();

        events.state(RunState::Idle);
        events.state(RunState::Fetching);

        // Rejected before the first batch, so there are no partials to carry.
        let window = match cfg.window() {
            Ok(window) => window,
            Err(e) => {
                warn!(target: "pipeline", error = %e, "run rejected");
                events.state(RunState::Error);
                let outcome = RunOutcome {
                    items: Vec::new(),
                    error: Some(e.to_string()),
                };
                events.send(RunEvent::Finished(outcome.clone()));
                return outcome;
            }
        };

        let sources = registry.active_for(cfg.region);
        let batch_size = self.settings.batch_size.max(1);
        let batches: Vec<&[Source]> = sources.chunks(batch_size).collect();
        info!(
            target: "pipeline",
            region = %cfg.region,
            sources = sources.len(),
            batches = batches.len(),
            "run started"
        );

        let mut acc: Vec<RawItem> = Vec::new();
        for (i, batch) in batches.iter().enumerate() {
            let fresh = self.fetch_batch(batch, now).await;
            acc.extend(fresh);
            acc = dedupe(acc);

            events.state(RunState::PartialMerge);
            events.send(RunEvent::Partial(acc.clone()));
            debug!(target: "pipeline", batch = i + 1, items = acc.len(), "partial merged");

            if !events.listening() {
                info!(target: "pipeline", batch = i + 1, "listener gone, stopping");
                break;
            }
            if started.elapsed() > self.settings.deadline() {
                counter!("pipeline_deadline_hits_total").increment(1);
                warn!(
                    target: "pipeline",
                    batch = i + 1,
                    remaining = batches.len() - i - 1,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "deadline reached, keeping partial results"
                );
                break;
            }
            if i + 1 < batches.len() {
                tokio::time::sleep(self.settings.pacing()).await;
            }
        }

        events.state(RunState::Finalizing);
        let items = finalize(acc, cfg, window, now);

        let elapsed_ms = started.elapsed().as_secs_f64() * 1_000.0;
        histogram!("pipeline_run_ms").record(elapsed_ms);
        info!(
            target: "pipeline",
            items = items.len(),
            elapsed_ms = elapsed_ms as u64,
            "run finished"
        );

        events.state(RunState::Done);
        let outcome = RunOutcome { items, error: None };
        events.send(RunEvent::Finished(outcome.clone()));
        outcome
    }

    /// Fetch every source of a batch concurrently; merge in registry order.
    /// Dropping the returned future aborts the batch's tasks.
    async fn fetch_batch(&self, batch: &[Source], now: DateTime<Utc>) -> Vec<RawItem> {
        let mut tasks = JoinSet::new();
        for (slot, source) in batch.iter().cloned().enumerate() {
            let fetcher = self.fetcher.clone();
            tasks.spawn(async move {
                let result = async {
                    let raw = fetcher.fetch_source(&source).await?;
                    Ok::<_, SourceError>(normalize_at(&raw, &source, now)?)
                }
                .await;
                (slot, result)
            });
        }

        let mut slots: Vec<Option<Result<Vec<RawItem>, SourceError>>> =
            (0..batch.len()).map(|_| None).collect();
        let mut task_error = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((slot, result)) => slots[slot] = Some(result),
                Err(e) => task_error = Some(e.to_string()),
            }
        }

        let mut out = Vec::new();
        for (source, result) in batch.iter().zip(slots) {
            let source_id = &source.id;
            let result = result.unwrap_or_else(|| {
                Err(SourceError::Task(
                    task_error.clone().unwrap_or_else(|| "task lost".into()),
                ))
            });
            match result {
                Ok(items) => {
                    debug!(target: "ingest", %source_id, items = items.len(), "source ok");
                    out.extend(items);
                }
                Err(e) => {
                    counter!("source_errors_total").increment(1);
                    warn!(target: "ingest", %source_id, error = %e, "source skipped");
                }
            }
        }
        out
    }
}

/// Classify, then exclusion → recency → whitepaper → query → category, newest first.
pub fn finalize(
    items: Vec<RawItem>,
    cfg: &RunConfig,
    window: DayWindow,
    now: DateTime<Utc>,
) -> Vec<ClassifiedItem> {
    let mut out: Vec<ClassifiedItem> = items
        .into_iter()
        .map(|raw| {
            let category = classify(&raw.title, &raw.summary, &raw.link);
            let id = item_id(&identity_key(&raw));
            ClassifiedItem { raw, category, id }
        })
        .filter(|it| !should_exclude(&it.raw))
        .filter(|it| within_recency(&it.raw, now, window))
        .filter(|it| !cfg.only_whitepaper || is_whitepaper(&it.raw))
        .filter(|it| matches_query(&it.raw, &cfg.search_query))
        .filter(|it| cfg.category.map_or(true, |c| it.category == c))
        .collect();
    out.sort_by(|a, b| b.raw.published_at.cmp(&a.raw.published_at));
    out
}
