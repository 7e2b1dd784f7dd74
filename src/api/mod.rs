use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use axum::{
    Router,
    extract::{
        Json, Query, State,
        rejection::{JsonRejection, QueryRejection},
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use chrono::{Local, NaiveDate};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use crate::core::{
    DEFAULT_PACE, Dashboard, FinalView, FixedDelay, Inputs, RunEvent, SimulationRecord,
    UniformDraws, animate, render_dashboard, render_final, run_to_completion,
};

const INDEX_HTML: &str = include_str!("../../web/index.html");
const STYLES_CSS: &str = include_str!("../../web/styles.css");
const APP_JS: &str = include_str!("../../web/app.js");

const EVENT_BUFFER: usize = 8;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    /// Delay between animated months on `/api/stream`.
    pub pace: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8080,
            pace: DEFAULT_PACE,
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

#[derive(Debug, Clone, Copy)]
struct AppState {
    pace: Duration,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SimulatePayload {
    horizon_months: Option<u32>,
    initial_balance: Option<f64>,
    return_threshold_pct: Option<f64>,
    contribution_threshold: Option<f64>,
    seed: Option<u64>,
    start_date: Option<NaiveDate>,
}

#[derive(Debug)]
struct ApiRequest {
    inputs: Inputs,
    start_date: Option<NaiveDate>,
}

impl ApiRequest {
    fn resolved_start_date(&self) -> NaiveDate {
        self.start_date.unwrap_or_else(|| Local::now().date_naive())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulateResponse {
    started: bool,
    horizon_months: u32,
    start_date: NaiveDate,
    records: Vec<SimulationRecord>,
    dashboard: Option<Dashboard>,
    #[serde(rename = "final")]
    final_view: Option<FinalView>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

pub fn router(config: &ServerConfig) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/index.html", get(index_handler))
        .route("/styles.css", get(styles_handler))
        .route("/app.js", get(app_js_handler))
        .route("/api/health", get(health_handler))
        .route(
            "/api/simulate",
            get(simulate_get_handler).post(simulate_post_handler),
        )
        .route("/api/stream", get(stream_handler))
        .fallback(not_found_handler)
        .with_state(AppState { pace: config.pace })
}

pub async fn run_http_server(config: ServerConfig) -> std::io::Result<()> {
    let addr = config.socket_addr();
    let app = router(&config);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(
        pace_ms = config.pace.as_millis() as u64,
        "AFORE dashboard listening on http://{addr}"
    );
    tracing::info!("Local access: http://127.0.0.1:{}/", config.port);

    axum::serve(listener, app).await
}

async fn index_handler() -> impl IntoResponse {
    with_cache_control(Html(INDEX_HTML))
}

async fn styles_handler() -> impl IntoResponse {
    with_cache_control((
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        STYLES_CSS,
    ))
}

async fn app_js_handler() -> impl IntoResponse {
    with_cache_control((
        [(
            header::CONTENT_TYPE,
            "application/javascript; charset=utf-8",
        )],
        APP_JS,
    ))
}

async fn health_handler() -> Response {
    json_response(
        StatusCode::OK,
        HealthResponse {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
        },
    )
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn simulate_get_handler(
    payload: Result<Query<SimulatePayload>, QueryRejection>,
) -> Response {
    match payload {
        Ok(Query(payload)) => simulate_handler_impl(payload),
        Err(rejection) => error_response(StatusCode::BAD_REQUEST, &rejection.body_text()),
    }
}

async fn simulate_post_handler(payload: Result<Json<SimulatePayload>, JsonRejection>) -> Response {
    match payload {
        Ok(Json(payload)) => simulate_handler_impl(payload),
        Err(rejection) => error_response(StatusCode::BAD_REQUEST, &rejection.body_text()),
    }
}

fn simulate_handler_impl(payload: SimulatePayload) -> Response {
    let request = match api_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };

    json_response(StatusCode::OK, build_simulate_response(&request))
}

async fn stream_handler(
    State(state): State<AppState>,
    payload: Result<Query<SimulatePayload>, QueryRejection>,
    ws: WebSocketUpgrade,
) -> Response {
    let payload = match payload {
        Ok(Query(payload)) => payload,
        Err(rejection) => {
            return error_response(StatusCode::BAD_REQUEST, &rejection.body_text());
        }
    };
    let request = match api_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };

    ws.on_upgrade(move |socket| stream_run(socket, request, state.pace))
}

async fn stream_run(socket: WebSocket, request: ApiRequest, pace: Duration) {
    let (mut outgoing, mut incoming) = socket.split();
    let (tx, mut rx) = mpsc::channel::<RunEvent>(EVENT_BUFFER);

    let inputs = request.inputs;
    let start_date = request.resolved_start_date();
    let run = tokio::spawn(async move {
        let mut draws = UniformDraws::for_inputs(&inputs);
        let mut pacer = FixedDelay(pace);
        animate(&inputs, start_date, &mut draws, &mut pacer, &tx).await
    });

    tracing::debug!("stream connected");
    loop {
        tokio::select! {
            event = rx.recv() => {
                let Some(event) = event else {
                    let _ = outgoing.send(Message::Close(None)).await;
                    break;
                };
                let text = match serde_json::to_string(&event) {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::error!("failed to encode run event: {e}");
                        break;
                    }
                };
                if outgoing.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            msg = incoming.next() => match msg {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    // Dropping the receiver ends a run whose viewer has left.
    drop(rx);
    match run.await {
        Ok(Ok(records)) => tracing::debug!(months = records.len(), "stream finished"),
        Ok(Err(e)) => tracing::info!("stream ended early: {e}"),
        Err(e) => tracing::error!("simulation task failed: {e}"),
    }
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    with_cache_control((status, Json(body)))
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn api_request_from_json(json: &str) -> Result<ApiRequest, String> {
    let payload = serde_json::from_str::<SimulatePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    api_request_from_payload(payload)
}

fn api_request_from_payload(payload: SimulatePayload) -> Result<ApiRequest, String> {
    let mut inputs = Inputs::default();

    if let Some(v) = payload.horizon_months {
        inputs.horizon_months = v;
    }
    if let Some(v) = payload.initial_balance {
        inputs.initial_balance = v;
    }
    if let Some(v) = payload.return_threshold_pct {
        inputs.return_threshold_pct = v;
    }
    if let Some(v) = payload.contribution_threshold {
        inputs.contribution_threshold = v;
    }
    inputs.seed = payload.seed;

    let inputs = inputs.validate().map_err(|e| e.to_string())?;

    Ok(ApiRequest {
        inputs,
        start_date: payload.start_date,
    })
}

fn build_simulate_response(request: &ApiRequest) -> SimulateResponse {
    let inputs = &request.inputs;
    let start_date = request.resolved_start_date();

    if !inputs.should_start() {
        return SimulateResponse {
            started: false,
            horizon_months: inputs.horizon_months,
            start_date,
            records: Vec::new(),
            dashboard: None,
            final_view: None,
        };
    }

    let mut draws = UniformDraws::for_inputs(inputs);
    let records = run_to_completion(inputs, start_date, &mut draws);
    tracing::debug!(months = records.len(), "simulate request served");

    SimulateResponse {
        started: true,
        horizon_months: inputs.horizon_months,
        start_date,
        dashboard: Some(render_dashboard(inputs, &records)),
        final_view: Some(render_final(inputs, &records)),
        records,
    }
}
