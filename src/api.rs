use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::analyze::classify::Category;
use crate::ingest::collapse_html;
use crate::ingest::pipeline::{ClassifiedItem, Pipeline, RunConfig};
use crate::ingest::registry::SourceRegistry;
use crate::ingest::types::{Region, Source};

const DEFAULT_REGION: Region = Region::Jp;
const DEFAULT_DAYS: u32 = 30;

/// Registry is swapped whole on every change; runs hold their own snapshot.
#[derive(Clone)]
pub struct AppState {
    registry: Arc<RwLock<Arc<SourceRegistry>>>,
    pipeline: Arc<Pipeline>,
}

impl AppState {
    pub fn new(registry: SourceRegistry, pipeline: Pipeline) -> Self {
        Self {
            registry: Arc::new(RwLock::new(Arc::new(registry))),
            pipeline: Arc::new(pipeline),
        }
    }

    pub async fn registry(&self) -> Arc<SourceRegistry> {
        self.registry.read().await.clone()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/items", get(list_items))
        .route("/sources", get(list_sources).post(add_source))
        .route("/sources/{id}/toggle", post(toggle_source))
        .route("/categories", get(list_categories))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn bad_request(msg: impl ToString) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorBody {
            error: msg.to_string(),
        }),
    )
}

fn parse_region(raw: Option<&str>) -> Result<Region, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => s.parse().map_err(bad_request),
        None => Ok(DEFAULT_REGION),
    }
}

#[derive(Deserialize)]
struct ItemsQuery {
    region: Option<String>,
    days: Option<u32>,
    whitepaper: Option<bool>,
    q: Option<String>,
    category: Option<String>,
}

#[derive(Serialize)]
struct ItemView {
    #[serde(flatten)]
    item: ClassifiedItem,
    category_label: &'static str,
    excerpt: String,
}

#[derive(Serialize)]
struct ItemsResp {
    items: Vec<ItemView>,
    error: Option<String>,
}

async fn list_items(
    State(state): State<AppState>,
    Query(q): Query<ItemsQuery>,
) -> Result<Json<ItemsResp>, ApiError> {
    let region = parse_region(q.region.as_deref())?;
    let category = match q.category.as_deref().map(str::trim) {
        Some(c) if !c.is_empty() && c != "all" => Some(c.parse::<Category>().map_err(bad_request)?),
        _ => None,
    };
    let cfg = RunConfig {
        region,
        day_window: q.days.unwrap_or(DEFAULT_DAYS),
        only_whitepaper: q.whitepaper.unwrap_or(false),
        search_query: q.q.unwrap_or_default(),
        category,
    };

    let registry = {
        let mut guard = state.registry.write().await;
        if let Some(next) = guard.ensure_region_enabled(region) {
            info!(target: "api", %region, "all sources of region were disabled, re-enabled");
            *guard = Arc::new(next);
        }
        guard.clone()
    };

    let outcome = state.pipeline.run(&registry, &cfg).await;
    let items = outcome
        .items
        .into_iter()
        .map(|item| ItemView {
            category_label: item.category.label(),
            excerpt: collapse_html(&item.raw.summary),
            item,
        })
        .collect();
    Ok(Json(ItemsResp {
        items,
        error: outcome.error,
    }))
}

#[derive(Deserialize)]
struct SourcesQuery {
    region: Option<String>,
}

async fn list_sources(
    State(state): State<AppState>,
    Query(q): Query<SourcesQuery>,
) -> Result<Json<Vec<Source>>, ApiError> {
    let registry = state.registry().await;
    let sources = match q.region.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(r) => {
            let region: Region = r.parse().map_err(bad_request)?;
            registry.for_region(region).into_iter().cloned().collect()
        }
        None => registry.all().to_vec(),
    };
    Ok(Json(sources))
}

#[derive(Deserialize)]
struct AddSourceReq {
    url: String,
    region: Region,
}

async fn add_source(
    State(state): State<AppState>,
    Json(body): Json<AddSourceReq>,
) -> Result<(StatusCode, Json<Source>), ApiError> {
    let url = body.url.trim();
    if url::Url::parse(url).is_err() {
        return Err(bad_request(format!("invalid source url: {url:?}")));
    }
    let mut guard = state.registry.write().await;
    let (next, added) = guard.add_custom(url, body.region);
    *guard = Arc::new(next);
    info!(target: "api", source_id = %added.id, region = %added.region, "custom source added");
    Ok((StatusCode::CREATED, Json(added)))
}

async fn toggle_source(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Source>, ApiError> {
    let mut guard = state.registry.write().await;
    let Some((next, toggled)) = guard.toggle(&id) else {
        return Err((
            StatusCode::NOT_FOUND,
            Json(ErrorBody {
                error: format!("unknown source id: {id}"),
            }),
        ));
    };
    *guard = Arc::new(next);
    info!(target: "api", source_id = %toggled.id, enabled = toggled.enabled, "source toggled");
    Ok(Json(toggled))
}

#[derive(Serialize)]
struct CategoryView {
    id: Category,
    label: &'static str,
}

async fn list_categories() -> Json<Vec<CategoryView>> {
    Json(
        Category::ALL
            .into_iter()
            .map(|c| CategoryView {
                id: c,
                label: c.label(),
            })
            .collect(),
    )
}
