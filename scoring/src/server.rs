use std::{sync::Arc, time::Instant};

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use clap::Parser;
use common::config::{ApiConfig, Config};
use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use serde_json::{Value, json};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    ingest,
    model::{GenericError, ModelInfo, Prediction, PredictionResult, TransactionRecord},
    scorers::Scorer,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to config file
    #[arg(short, long, default_value = "config/api.yaml")]
    pub config: String,
}

pub fn initialize_executable() -> Result<Config, GenericError> {
    let args = Args::parse();
    println!("Loading config from: {}", args.config);
    let config = Config::load(&args.config)?;

    Ok(config)
}

pub fn initialize_tracing(log_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[derive(Clone)]
pub struct AppState {
    pub service_name: String,
    pub scorer: Arc<dyn Scorer>,
}

impl AppState {
    pub fn new(service_name: impl Into<String>, scorer: Arc<dyn Scorer>) -> Self {
        Self {
            service_name: service_name.into(),
            scorer,
        }
    }
}

/// Error response rendered as an `{"error": message}` JSON body.
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    /// Internal failures are logged in full; the caller only sees a generic
    /// message.
    pub fn internal(error: GenericError) -> Self {
        tracing::error!(error = %error, "Unexpected internal failure");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/predict", post(predict))
        .route("/api/batch-predict", post(batch_predict))
        .route("/api/model-info", get(model_info))
        .route("/api/upload", post(upload))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

pub async fn run_api(config: ApiConfig, state: AppState) -> Result<(), GenericError> {
    let prometheus = PrometheusBuilder::new().install_recorder()?;
    let app = build_router(state).route(
        "/metrics",
        get(move || {
            let handle = prometheus.clone();
            async move { handle.render() }
        }),
    );

    tracing::info!("Starting scoring service at {}", config.server_address);
    let listener = tokio::net::TcpListener::bind(&config.server_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": state.service_name,
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

pub async fn predict(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<PredictionResult>, ApiError> {
    let request: Value = serde_json::from_slice(&body)
        .map_err(|_| ApiError::bad_request("Missing transaction data"))?;

    // Legacy callers wrap the transaction in a JSON-encoded `data` string;
    // unwrap it here so the scorer only ever sees plain records.
    let payload = match request.get("data") {
        Some(Value::String(raw)) => serde_json::from_str(raw)
            .map_err(|_| ApiError::bad_request("Invalid JSON format in data field"))?,
        Some(_) => return Err(ApiError::bad_request("Invalid JSON format in data field")),
        None => request,
    };

    if payload.get("amount").is_none() {
        return Err(ApiError::bad_request("Missing required field: amount"));
    }

    let record = TransactionRecord::from_value(&payload)
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    let started = Instant::now();
    let result = state
        .scorer
        .predict(&record)
        .await
        .map_err(ApiError::internal)?;
    histogram!("sentra_predict_seconds").record(started.elapsed().as_secs_f64());
    counter!("sentra_predictions_total", "prediction" => result.prediction.to_string()).increment(1);

    tracing::info!(
        "Prediction made: {} (confidence: {:.2})",
        result.prediction,
        result.confidence
    );

    Ok(Json(result))
}

pub async fn batch_predict(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let request: Value = serde_json::from_slice(&body)
        .map_err(|_| ApiError::bad_request("Missing transactions data"))?;
    let transactions = request
        .get("transactions")
        .and_then(Value::as_array)
        .ok_or_else(|| ApiError::bad_request("Missing transactions data"))?;

    let started = Instant::now();
    let results = state.scorer.predict_many(transactions).await;
    histogram!("sentra_batch_seconds").record(started.elapsed().as_secs_f64());

    tracing::info!("Scored batch of {} transactions", results.len());

    Ok(Json(json!({ "results": results })))
}

pub async fn model_info(State(state): State<AppState>) -> Json<ModelInfo> {
    Json(state.scorer.model_info())
}

pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let mut picked: Option<(String, Bytes)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart upload: {e}")))?
    {
        let is_file_field = field.name() == Some("file");
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Invalid multipart upload: {e}")))?;
        if is_file_field {
            picked = Some((file_name, data));
            break;
        }
        if picked.is_none() {
            picked = Some((file_name, data));
        }
    }
    let (file_name, data) =
        picked.ok_or_else(|| ApiError::bad_request("Missing file upload"))?;

    let records = ingest::records_from_upload(&file_name, &data)
        .map_err(|e| ApiError::bad_request(e.to_string()))?;
    let results = state.scorer.predict_many(&records).await;

    let fraud = results
        .iter()
        .filter(|e| e.prediction() == Some(Prediction::Fraud))
        .count();
    let legitimate = results
        .iter()
        .filter(|e| e.prediction() == Some(Prediction::Legitimate))
        .count();
    let errors = results.iter().filter(|e| !e.is_scored()).count();

    tracing::info!(
        "Scored {} uploaded records from {}",
        results.len(),
        file_name
    );

    Ok(Json(json!({
        "results": results,
        "summary": {
            "total": results.len(),
            "fraud": fraud,
            "legitimate": legitimate,
            "errors": errors,
        },
    })))
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Endpoint not found" })),
    )
}
