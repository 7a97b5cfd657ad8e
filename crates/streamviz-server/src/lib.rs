//! HTTP dataset and live-stream server.
//!
//! Serves generated datasets (`/api/data`) and a read-only view of a live
//! [`StreamService`] (`/api/stream`). Failed dataset requests return a
//! structured fault and never partial data.

use std::sync::Arc;

use axum::{
    Router,
    extract::rejection::{JsonRejection, QueryRejection},
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use streamviz_core::{
    AggregatedSample, AggregationPeriod, Category, Dataset, ExtendRequest, FetchRequest,
    FilterConfig, GenerationError, Reducer, Sample, StreamGenerator, StreamService, StreamStatus,
    TimeRange, aggregate, downsample, extend_dataset, fetch_dataset, filter_snapshot,
};

/// Default number of points returned by `/api/stream`.
const DEFAULT_STREAM_POINTS: usize = 1000;

/// Shared server state.
struct AppState {
    generator: Arc<Mutex<StreamGenerator>>,
    service: Arc<StreamService>,
}

/// Structured failure body.
#[derive(Debug, Serialize)]
struct Fault {
    success: bool,
    error: String,
    kind: &'static str,
    #[serde(skip)]
    status: StatusCode,
}

impl Fault {
    fn generation(error: impl std::fmt::Display) -> Self {
        Self {
            success: false,
            error: error.to_string(),
            kind: "generation_failure",
            status: StatusCode::BAD_REQUEST,
        }
    }

    fn invalid(error: impl std::fmt::Display) -> Self {
        Self {
            kind: "invalid_request",
            ..Self::generation(error)
        }
    }

    fn internal(error: impl std::fmt::Display) -> Self {
        Self {
            kind: "internal",
            status: StatusCode::INTERNAL_SERVER_ERROR,
            ..Self::generation(error)
        }
    }
}

impl From<GenerationError> for Fault {
    fn from(e: GenerationError) -> Self {
        Self::generation(e)
    }
}

impl IntoResponse for Fault {
    fn into_response(self) -> Response {
        log::warn!("request failed ({}): {}", self.kind, self.error);
        (self.status, Json(self)).into_response()
    }
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct StreamParams {
    max_points: Option<usize>,
    /// Comma-separated category labels, e.g. `A,C`.
    categories: Option<String>,
    min_value: Option<f64>,
    max_value: Option<f64>,
    range: Option<String>,
}

impl StreamParams {
    fn filter(&self) -> Result<FilterConfig, Fault> {
        let categories = match &self.categories {
            Some(list) => list
                .split(',')
                .filter(|c| !c.trim().is_empty())
                .map(str::parse::<Category>)
                .collect::<Result<Vec<_>, _>>()
                .map_err(Fault::invalid)?,
            None => Vec::new(),
        };
        let value_range = match (self.min_value, self.max_value) {
            (None, None) => None,
            (lo, hi) => Some((lo.unwrap_or(f64::NEG_INFINITY), hi.unwrap_or(f64::INFINITY))),
        };
        let time_range = match &self.range {
            Some(r) => r.parse::<TimeRange>().map_err(Fault::invalid)?,
            None => TimeRange::All,
        };
        Ok(FilterConfig {
            categories,
            value_range,
            time_range,
        })
    }
}

#[derive(Debug, Serialize)]
struct StreamResponse {
    status: StreamStatus,
    /// Samples left after filtering, before downsampling.
    matched: usize,
    data: Vec<Sample>,
}

#[derive(Deserialize)]
struct AggregateParams {
    period: Option<String>,
    reducer: Option<String>,
}

#[derive(Debug, Serialize)]
struct AggregateResponse {
    period: AggregationPeriod,
    reducer: Reducer,
    buckets: Vec<AggregatedSample>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    streaming: bool,
    length: usize,
    capacity: usize,
}

// ---------------------------------------------------------------------------
// Dataset endpoints
// ---------------------------------------------------------------------------

/// Run `job` against the shared generator on the blocking pool.
async fn generate<F>(state: &AppState, job: F) -> Result<Dataset, Fault>
where
    F: FnOnce(&mut StreamGenerator) -> Result<Dataset, GenerationError> + Send + 'static,
{
    let generator = Arc::clone(&state.generator);
    let dataset = tokio::task::spawn_blocking(move || job(&mut generator.blocking_lock()))
        .await
        .map_err(Fault::internal)??;
    Ok(dataset)
}

async fn handle_fetch(
    State(state): State<Arc<AppState>>,
    params: Result<Query<FetchRequest>, QueryRejection>,
) -> Result<Json<Dataset>, Fault> {
    let Query(request) = params.map_err(|e| Fault::generation(e.body_text()))?;
    let dataset = generate(&state, move |g| fetch_dataset(g, &request)).await?;
    Ok(Json(dataset))
}

async fn handle_extend(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ExtendRequest>, JsonRejection>,
) -> Result<Json<Dataset>, Fault> {
    let Json(request) = body.map_err(|e| Fault::generation(e.body_text()))?;
    let dataset = generate(&state, move |g| extend_dataset(g, &request)).await?;
    Ok(Json(dataset))
}

// ---------------------------------------------------------------------------
// Live stream endpoints
// ---------------------------------------------------------------------------

async fn handle_stream(
    State(state): State<Arc<AppState>>,
    params: Result<Query<StreamParams>, QueryRejection>,
) -> Result<Json<StreamResponse>, Fault> {
    let Query(params) = params.map_err(|e| Fault::invalid(e.body_text()))?;
    let filter = params.filter()?;
    let max_points = params.max_points.unwrap_or(DEFAULT_STREAM_POINTS);
    let view = filter_snapshot(state.service.snapshot(), &filter);
    Ok(Json(StreamResponse {
        status: state.service.status(),
        matched: view.len(),
        data: downsample(&view, max_points).into_owned(),
    }))
}

async fn handle_aggregate(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AggregateParams>,
) -> Result<Json<AggregateResponse>, Fault> {
    let config = state.service.config();
    let period = match params.period {
        Some(p) => p.parse::<AggregationPeriod>().map_err(Fault::invalid)?,
        None => config.aggregation_period,
    };
    let reducer = match params.reducer {
        Some(r) => r.parse::<Reducer>().map_err(Fault::invalid)?,
        None => config.reducer,
    };

    let snapshot = state.service.snapshot();
    Ok(Json(AggregateResponse {
        period,
        reducer,
        buckets: aggregate(&snapshot, period.as_millis(), reducer),
    }))
}

async fn handle_toggle(State(state): State<Arc<AppState>>) -> Result<Json<StreamStatus>, Fault> {
    let service = Arc::clone(&state.service);
    // Stopping joins the producer thread.
    let status = tokio::task::spawn_blocking(move || {
        service.toggle();
        service.status()
    })
    .await
    .map_err(Fault::internal)?;
    Ok(Json(status))
}

async fn handle_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let status = state.service.status();
    Json(HealthResponse {
        status: "healthy",
        streaming: status.is_streaming,
        length: status.length,
        capacity: status.capacity,
    })
}

async fn handle_index() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": "streamviz server",
        "version": streamviz_core::VERSION,
        "endpoints": {
            "/": "This API index",
            "/api/data": {
                "GET": {
                    "description": "Initial dataset ending at startTime",
                    "params": {
                        "count": "Number of samples (0-1000000, default: 10000)",
                        "startTime": "Epoch ms (default: now)",
                    }
                },
                "POST": {
                    "description": "Batch continuing from lastValue",
                    "body": {
                        "count": "Number of samples (default: 100)",
                        "lastValue": "Value to continue the walk from",
                    }
                }
            },
            "/api/stream": {
                "GET": {
                    "description": "Live window status and filtered, downsampled data",
                    "params": {
                        "maxPoints": "Points returned after downsampling (default: 1000)",
                        "categories": "Comma-separated labels to keep, e.g. A,C (default: all)",
                        "minValue": "Inclusive lower value bound",
                        "maxValue": "Inclusive upper value bound",
                        "range": "Look-back from the newest sample: 1min|5min|15min|1hour|all",
                    }
                }
            },
            "/api/stream/aggregate": "Live window buckets (?period=1min|5min|1hour&reducer=avg|sum|min|max)",
            "/api/stream/toggle": "POST: start or stop streaming",
            "/health": "Health check",
        },
        "examples": {
            "fetch": "/api/data?count=500",
            "aggregate": "/api/stream/aggregate?period=5min&reducer=max",
            "filter": "/api/stream?categories=A,B&minValue=95&range=5min",
        }
    }))
}

/// Build the axum router around a live stream and a dataset generator.
pub fn build_router(service: Arc<StreamService>, generator: StreamGenerator) -> Router {
    let state = Arc::new(AppState {
        generator: Arc::new(Mutex::new(generator)),
        service,
    });

    Router::new()
        .route("/", get(handle_index))
        .route("/health", get(handle_health))
        .route("/api/data", get(handle_fetch).post(handle_extend))
        .route("/api/stream", get(handle_stream))
        .route("/api/stream/aggregate", get(handle_aggregate))
        .route("/api/stream/toggle", post(handle_toggle))
        .with_state(state)
}

/// Run the HTTP server until the listener fails.
pub async fn run_server(
    service: Arc<StreamService>,
    generator: StreamGenerator,
    host: &str,
    port: u16,
) -> std::io::Result<()> {
    let app = build_router(service, generator);
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use streamviz_core::{GeneratorConfig, StreamConfig};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn state() -> Arc<AppState> {
        let config = StreamConfig {
            initial_count: 3_000,
            max_data_points: 5_000,
            ..Default::default()
        };
        let generator = StreamGenerator::with_seed(&GeneratorConfig::default(), 3).unwrap();
        let service = StreamService::with_generator(config, generator).unwrap();
        Arc::new(AppState {
            generator: Arc::new(Mutex::new(
                StreamGenerator::with_seed(&GeneratorConfig::default(), 4).unwrap(),
            )),
            service: Arc::new(service),
        })
    }

    #[tokio::test]
    async fn fetch_returns_requested_count() {
        let request = FetchRequest {
            count: Some(25),
            start_time: Some(10_000),
        };
        let Json(ds) = handle_fetch(State(state()), Ok(Query(request))).await.unwrap();
        assert_eq!(ds.count, 25);
        assert_eq!(ds.data.last().unwrap().timestamp, 9_900);
    }

    #[tokio::test]
    async fn fetch_negative_count_is_fault() {
        let request = FetchRequest {
            count: Some(-5),
            start_time: None,
        };
        let fault = handle_fetch(State(state()), Ok(Query(request)))
            .await
            .unwrap_err();
        assert_eq!(fault.status, StatusCode::BAD_REQUEST);
        assert_eq!(fault.kind, "generation_failure");
        assert!(!fault.success);
    }

    #[tokio::test]
    async fn extend_defaults() {
        let Json(ds) = handle_extend(State(state()), Ok(Json(ExtendRequest::default())))
            .await
            .unwrap();
        assert_eq!(ds.count, 100);
    }

    #[tokio::test]
    async fn stream_is_downsampled() {
        let params = StreamParams {
            max_points: Some(100),
            ..Default::default()
        };
        let Json(resp) = handle_stream(State(state()), Ok(Query(params))).await.unwrap();
        assert_eq!(resp.status.length, 3_000);
        assert_eq!(resp.data.len(), 100);
        assert_eq!(resp.data[0].metadata.unwrap().original, Some(30));
    }

    #[tokio::test]
    async fn stream_applies_filter_params() {
        let s = state();
        let params = StreamParams {
            max_points: Some(10_000),
            categories: Some("a, C".into()),
            min_value: Some(0.0),
            range: Some("1min".into()),
            ..Default::default()
        };
        let Json(resp) = handle_stream(State(Arc::clone(&s)), Ok(Query(params)))
            .await
            .unwrap();
        assert_eq!(resp.status.length, 3_000);
        assert!(resp.matched > 0 && resp.matched <= 601);
        assert_eq!(resp.data.len(), resp.matched);
        assert!(
            resp.data
                .iter()
                .all(|x| matches!(x.category, Category::A | Category::C) && x.value >= 0.0)
        );

        let narrow = StreamParams {
            max_value: Some(f64::NEG_INFINITY),
            ..Default::default()
        };
        let Json(empty) = handle_stream(State(s), Ok(Query(narrow))).await.unwrap();
        assert_eq!(empty.matched, 0);
        assert!(empty.data.is_empty());
    }

    #[tokio::test]
    async fn stream_rejects_unknown_filter_values() {
        let s = state();
        for params in [
            StreamParams {
                categories: Some("A,Z".into()),
                ..Default::default()
            },
            StreamParams {
                range: Some("2min".into()),
                ..Default::default()
            },
        ] {
            let fault = handle_stream(State(Arc::clone(&s)), Ok(Query(params)))
                .await
                .unwrap_err();
            assert_eq!(fault.kind, "invalid_request");
            assert_eq!(fault.status, StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    async fn stream_filter_over_http() {
        let s = state();
        let app = build_router(
            Arc::clone(&s.service),
            StreamGenerator::with_seed(&GeneratorConfig::default(), 7).unwrap(),
        );
        let response = raw_request(
            app,
            "GET /api/stream?categories=B&range=5min&maxPoints=5 HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
        )
        .await;
        assert!(response.starts_with("HTTP/1.1 200"), "{response}");
        assert!(response.contains("\"matched\":"));
        assert!(!response.contains("\"category\":\"A\""));
    }

    #[tokio::test]
    async fn aggregate_uses_config_defaults_and_parses_params() {
        let s = state();
        let params = AggregateParams {
            period: None,
            reducer: Some("max".into()),
        };
        let Json(resp) = handle_aggregate(State(Arc::clone(&s)), Query(params))
            .await
            .unwrap();
        assert_eq!(resp.period, AggregationPeriod::OneMinute);
        assert_eq!(resp.reducer, Reducer::Max);
        let total: usize = resp.buckets.iter().map(|b| b.source_count).sum();
        assert_eq!(total, 3_000);

        let bad = AggregateParams {
            period: Some("2min".into()),
            reducer: None,
        };
        let fault = handle_aggregate(State(s), Query(bad)).await.unwrap_err();
        assert_eq!(fault.kind, "invalid_request");
    }

    #[tokio::test]
    async fn toggle_flips_streaming() {
        let s = state();
        let Json(on) = handle_toggle(State(Arc::clone(&s))).await.unwrap();
        assert!(on.is_streaming);
        let Json(off) = handle_toggle(State(Arc::clone(&s))).await.unwrap();
        assert!(!off.is_streaming);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn fetch_leaves_the_runtime_free() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let polls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&polls);
        let ticker = tokio::spawn(async move {
            loop {
                counter.fetch_add(1, Ordering::Relaxed);
                tokio::task::yield_now().await;
            }
        });

        let request = FetchRequest {
            count: Some(100_000),
            start_time: Some(0),
        };
        let Json(ds) = handle_fetch(State(state()), Ok(Query(request))).await.unwrap();
        let seen = polls.load(Ordering::Relaxed);
        ticker.abort();

        assert_eq!(ds.count, 100_000);
        assert!(seen > 0, "other tasks starved during generation");
    }

    #[tokio::test]
    async fn panicking_generation_is_internal_fault() {
        let s = state();
        let fault = generate(&s, |_| panic!("generator blew up"))
            .await
            .unwrap_err();
        assert_eq!(fault.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(fault.kind, "internal");

        // The generator stays usable after a failed job.
        let Json(ds) = handle_extend(State(s), Ok(Json(ExtendRequest::default())))
            .await
            .unwrap();
        assert_eq!(ds.count, 100);
    }

    #[tokio::test]
    async fn fault_body_shape() {
        let json = serde_json::to_value(Fault::generation("boom")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"success": false, "error": "boom", "kind": "generation_failure"})
        );
    }

    async fn raw_request(app: Router, request: &str) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    #[tokio::test]
    async fn malformed_json_body_is_structured_fault() {
        let s = state();
        let app = build_router(
            Arc::clone(&s.service),
            StreamGenerator::with_seed(&GeneratorConfig::default(), 5).unwrap(),
        );
        let body = "{not json";
        let request = format!(
            "POST /api/data HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        let response = raw_request(app, &request).await;
        assert!(response.starts_with("HTTP/1.1 400"), "{response}");
        assert!(response.contains("\"kind\":\"generation_failure\""));
        assert!(response.contains("\"success\":false"));
    }

    #[tokio::test]
    async fn get_data_over_http() {
        let s = state();
        let app = build_router(
            Arc::clone(&s.service),
            StreamGenerator::with_seed(&GeneratorConfig::default(), 6).unwrap(),
        );
        let response = raw_request(
            app,
            "GET /api/data?count=2&startTime=1000 HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
        )
        .await;
        assert!(response.starts_with("HTTP/1.1 200"), "{response}");
        assert!(response.contains("\"count\":2"));
        assert!(response.contains("\"timestamp\":800"));
    }
}
