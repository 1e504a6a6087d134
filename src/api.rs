use std::sync::Arc;

use axum::{
    extract::{Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::CorsLayer;

use crate::bot::Bot;
use crate::compose::ComposeOutcome;
use crate::ingest::report::IngestReport;
use crate::ingest::types::StoredRecord;
use crate::publish::PublishedPost;
use crate::rate_limit::{self, RateLimitConfig};

pub const API_KEY_HEADER: &str = "x-api-key";

const MAX_TOP_LIMIT: usize = 50;

#[derive(Clone)]
pub struct AppState {
    pub bot: Arc<Bot>,
    /// Required `x-api-key` value; `None` leaves the routes open.
    pub api_key: Option<Arc<str>>,
    pub metrics: Option<PrometheusHandle>,
    /// Throttle for the key-protected routes; `/health` is never limited.
    pub rate_limit: RateLimitConfig,
}

impl AppState {
    pub fn new(bot: Arc<Bot>) -> Self {
        Self {
            bot,
            api_key: None,
            metrics: None,
            rate_limit: RateLimitConfig::new(0),
        }
    }

    pub fn with_api_key(mut self, key: Option<String>) -> Self {
        self.api_key = key.map(Arc::from);
        self
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    pub fn with_rate_limit(mut self, cfg: RateLimitConfig) -> Self {
        self.rate_limit = cfg;
        self
    }
}

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/ingest", post(trigger_ingest))
        .route("/compose", post(trigger_compose))
        .route("/posts/top", get(top_posts))
        .route("/debug/published", get(debug_published))
        .route("/metrics", get(render_metrics));
    // Key check wraps the throttle: rejected callers do not drain the bucket.
    let protected = rate_limit::apply(protected, state.rate_limit).route_layer(
        middleware::from_fn_with_state(state.clone(), require_api_key),
    );

    Router::new()
        .route("/health", get(|| async { "OK" }))
        .merge(protected)
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

async fn require_api_key(State(state): State<AppState>, req: Request, next: Next) -> Response {
    if let Some(expected) = &state.api_key {
        let provided = req
            .headers()
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok());
        if provided != Some(expected.as_ref()) {
            return (StatusCode::UNAUTHORIZED, "invalid or missing api key").into_response();
        }
    }
    next.run(req).await
}

async fn trigger_ingest(State(state): State<AppState>) -> Json<IngestReport> {
    Json(state.bot.ingest().await)
}

async fn trigger_compose(
    State(state): State<AppState>,
) -> Result<Json<ComposeOutcome>, (StatusCode, String)> {
    state
        .bot
        .compose()
        .await
        .map(Json)
        .map_err(|e| (StatusCode::BAD_GATEWAY, e.to_string()))
}

#[derive(serde::Deserialize)]
struct TopQuery {
    #[serde(default)]
    limit: Option<usize>,
}

async fn top_posts(
    State(state): State<AppState>,
    Query(q): Query<TopQuery>,
) -> Result<Json<Vec<StoredRecord>>, (StatusCode, String)> {
    let limit = q.limit.unwrap_or(10).min(MAX_TOP_LIMIT);
    state
        .bot
        .store()
        .top_by_engagement(limit)
        .await
        .map(Json)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

async fn debug_published(State(state): State<AppState>) -> Json<Vec<PublishedPost>> {
    Json(state.bot.published(20))
}

async fn render_metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(h) => h.render().into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}
