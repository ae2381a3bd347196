use crate::config::toml_config::WardstatsConfig;
use crate::dashboard::dataset::Dataset;
use crate::dashboard::figures::FigureBuilder;
use crate::dashboard::page::render_index;
use crate::domain::model::Metric;
use crate::utils::error::{EtlError, Result};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// 所有 handler 共用的唯讀狀態
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<WardstatsConfig>,
    pub dataset: Arc<Dataset>,
}

impl AppState {
    pub fn new(config: WardstatsConfig, dataset: Dataset) -> Self {
        Self {
            config: Arc::new(config),
            dataset: Arc::new(dataset),
        }
    }

    fn figures(&self) -> FigureBuilder<'_> {
        FigureBuilder::new(&self.config, &self.dataset)
    }

    fn metric_or_default(&self, metric: Option<&str>) -> Result<Metric> {
        match metric {
            Some(m) => m.parse(),
            None => Ok(self.config.dashboard.default_metric),
        }
    }
}

pub struct ApiError(EtlError);

impl From<EtlError> for ApiError {
    fn from(error: EtlError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            EtlError::LookupError { .. } => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!("❌ {}", self.0);
        }

        let body = Json(json!({
            "error": self.0.to_string(),
            "message": self.0.user_friendly_message(),
        }));
        (status, body).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Deserialize)]
pub struct MapQuery {
    pub metric: Option<String>,
    pub date_index: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct TimeseriesQuery {
    pub metric: Option<String>,
    pub icb: Option<String>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/options", get(options))
        .route("/api/map", get(map))
        .route("/api/timeseries", get(timeseries))
        .route("/api/boundaries", get(boundaries))
        .route("/healthz", get(healthz))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

pub async fn serve(state: AppState, addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("📊 Dashboard listening on http://{}", listener.local_addr()?);
    axum::serve(listener, create_router(state)).await?;
    Ok(())
}

async fn index(State(state): State<AppState>) -> Html<String> {
    Html(render_index(&state.config))
}

async fn options(State(state): State<AppState>) -> Json<Value> {
    Json(json!(state.figures().controls()))
}

async fn map(State(state): State<AppState>, Query(query): Query<MapQuery>) -> ApiResult<Json<Value>> {
    let metric = state.metric_or_default(query.metric.as_deref())?;
    let date = match query.date_index {
        Some(index) => Some(state.dataset.date_at(index)?),
        None => None,
    };
    Ok(Json(state.figures().map_figure(metric, date)?))
}

async fn timeseries(
    State(state): State<AppState>,
    Query(query): Query<TimeseriesQuery>,
) -> ApiResult<Json<Value>> {
    let metric = state.metric_or_default(query.metric.as_deref())?;
    let icb = query
        .icb
        .unwrap_or_else(|| state.config.dashboard.default_icb.clone());
    Ok(Json(state.figures().timeseries_figure(&icb, metric)?))
}

async fn boundaries(State(state): State<AppState>) -> Json<Value> {
    Json(state.dataset.boundaries().geojson().clone())
}

async fn healthz(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "records": state.dataset.rows().len(),
        "months": state.dataset.dates().len(),
    }))
}
