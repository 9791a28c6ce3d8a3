//! HTTP orchestrator: accepts run configurations, drives a headless browser
//! through the survey and returns the accumulated logs.

mod chrome;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{Local, NaiveDate, NaiveTime};
use clap::Parser;
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use tracing::info;

use survey_autofill::error::AutomatonError;
use survey_autofill::runner::{self, LoopOptions, Outcome, RunReport};
use survey_autofill::{RatingMode, RunConfig};

/// Pause between runs of a batch, so sequential sessions do not hammer the
/// target back to back.
const BATCH_PAUSE: Duration = Duration::from_secs(3);
const MAX_BATCH: usize = 10;

#[derive(Parser)]
#[command(name = "survey-server", about = "Orchestrateur de remplissage de questionnaires")]
struct Args {
    /// Survey entry URL opened for every run.
    #[arg(long)]
    url: String,
    /// Listen port; the PORT environment variable wins when set.
    #[arg(long, default_value_t = 3000)]
    port: u16,
    /// Run the browser with a visible window instead of headless.
    #[arg(long)]
    headed: bool,
}

struct AppState {
    url: String,
    headless: bool,
}

/// `POST /fill` and `/fill-multiple` payload. Everything is optional; the
/// server applies defaults the same way for both routes.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct FillRequest {
    restaurant_num: Option<String>,
    date_start: Option<String>,
    date_end: Option<String>,
    hour_start: Option<String>,
    hour_end: Option<String>,
    order_mode: Option<String>,
    comment: Option<String>,
    rating_mode: Option<String>,
    default_text: Option<String>,
    age: Option<String>,
    delay_ms: Option<u64>,
    auto_next: Option<bool>,
    count: Option<usize>,
}

#[derive(Serialize)]
struct FillResponse {
    success: bool,
    logs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl From<RunReport> for FillResponse {
    fn from(report: RunReport) -> Self {
        let error = match &report.outcome {
            Outcome::Failed(message) => Some(message.clone()),
            _ => None,
        };
        Self {
            success: report.outcome.is_success(),
            logs: report.logs,
            error,
        }
    }
}

#[derive(Serialize)]
struct BatchEntry {
    index: usize,
    success: bool,
    logs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize)]
struct BatchResponse {
    total: usize,
    results: Vec<BatchEntry>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(args.port);

    let state = Arc::new(AppState {
        url: args.url,
        headless: !args.headed,
    });

    let app = Router::new()
        .route("/", get(health_handler))
        .route("/fill", post(fill_handler))
        .route("/fill-multiple", post(fill_multiple_handler))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{port}")).await?;
    info!("Serveur demarre sur le port {port}");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok", "message": "Survey auto-fill server" }))
}

async fn fill_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<FillRequest>,
) -> Result<Json<FillResponse>, (StatusCode, String)> {
    let cfg = resolve_config(&request).map_err(bad_request)?;
    info!("Nouvelle requete: {cfg:?}");

    let report = tokio::task::spawn_blocking(move || run_once(&state, &cfg))
        .await
        .map_err(internal_error)?;
    Ok(Json(report.into()))
}

async fn fill_multiple_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<FillRequest>,
) -> Result<Json<BatchResponse>, (StatusCode, String)> {
    let cfg = resolve_config(&request).map_err(bad_request)?;
    let count = request.count.unwrap_or(1).clamp(1, MAX_BATCH);
    info!("Remplissage de {count} questionnaires");

    let batch = tokio::task::spawn_blocking(move || {
        runner::run_batch(
            count,
            BATCH_PAUSE,
            || open_session(&state),
            &cfg,
            &LoopOptions::site(),
        )
    })
    .await
    .map_err(internal_error)?;

    let results = batch
        .results
        .into_iter()
        .map(|entry| {
            let response = FillResponse::from(entry.report);
            BatchEntry {
                index: entry.index,
                success: response.success,
                logs: response.logs,
                error: response.error,
            }
        })
        .collect();
    Ok(Json(BatchResponse {
        total: batch.total,
        results,
    }))
}

fn run_once(state: &AppState, cfg: &RunConfig) -> RunReport {
    match open_session(state) {
        Ok(mut driver) => runner::run(&mut driver, cfg, &LoopOptions::site()),
        Err(err) => {
            let message = err.to_string();
            RunReport {
                outcome: Outcome::Failed(message.clone()),
                logs: vec![format!("Erreur: {message}")],
                pages: 0,
            }
        }
    }
}

/// A fresh browser session per run; dropping the driver closes it on every
/// exit path.
fn open_session(state: &AppState) -> Result<chrome::ChromeDriver, AutomatonError> {
    let mut driver = chrome::ChromeDriver::launch(state.headless)?;
    driver.open(&state.url)?;
    Ok(driver)
}

/// Apply the server-side defaults, then overlay whatever the payload set.
fn resolve_config(request: &FillRequest) -> Result<RunConfig, String> {
    let today = Local::now().date_naive();
    let mut cfg = RunConfig::rolling_window(today);

    if let Some(v) = &request.restaurant_num {
        cfg.restaurant_num = v.clone();
    }
    if let Some(v) = &request.date_start {
        cfg.date_start = parse_date("dateStart", v)?;
    }
    if let Some(v) = &request.date_end {
        cfg.date_end = parse_date("dateEnd", v)?;
    }
    if let Some(v) = &request.hour_start {
        cfg.hour_start = parse_time("hourStart", v)?;
    }
    if let Some(v) = &request.hour_end {
        cfg.hour_end = parse_time("hourEnd", v)?;
    }
    if let Some(v) = &request.order_mode {
        cfg.order_mode = v.parse()?;
    }
    if let Some(v) = &request.comment {
        cfg.comment = v.clone();
    }
    if let Some(v) = &request.rating_mode {
        cfg.rating_mode = RatingMode::from_keyword(v);
    }
    if let Some(v) = &request.default_text {
        cfg.default_text = v.clone();
    }
    if let Some(v) = &request.age {
        cfg.age = Some(v.clone());
    }
    if let Some(ms) = request.delay_ms {
        cfg.step_delay = Duration::from_millis(ms);
    }
    if let Some(v) = request.auto_next {
        cfg.auto_next = v;
    }
    Ok(cfg)
}

fn parse_date(field: &str, value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| format!("{field}: {e}"))
}

fn parse_time(field: &str, value: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(value, "%H:%M").map_err(|e| format!("{field}: {e}"))
}

fn bad_request(message: String) -> (StatusCode, String) {
    (StatusCode::BAD_REQUEST, message)
}

fn internal_error(err: tokio::task::JoinError) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, format!("tache interrompue: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_overlays_defaults() {
        let request = FillRequest {
            date_start: Some("2024-01-01".to_string()),
            date_end: Some("2024-01-04".to_string()),
            hour_start: Some("09:30".to_string()),
            order_mode: Some("3".to_string()),
            ..Default::default()
        };
        let cfg = resolve_config(&request).unwrap();
        assert_eq!(cfg.date_start, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(cfg.hour_start, NaiveTime::from_hms_opt(9, 30, 0).unwrap());
        assert_eq!(cfg.restaurant_num, "0610");
        assert_eq!(cfg.hour_end, NaiveTime::from_hms_opt(22, 0, 0).unwrap());
    }

    #[test]
    fn malformed_dates_are_rejected() {
        let request = FillRequest {
            date_start: Some("01/02/2024".to_string()),
            ..Default::default()
        };
        assert!(resolve_config(&request).unwrap_err().starts_with("dateStart"));
    }

    #[test]
    fn camel_case_payload_deserializes() {
        let raw = r#"{"restaurantNum": "0042", "hourEnd": "21:00", "count": 25, "autoNext": false}"#;
        let request: FillRequest = serde_json::from_str(raw).unwrap();
        assert_eq!(request.restaurant_num.as_deref(), Some("0042"));
        assert_eq!(request.count, Some(25));
        assert_eq!(request.auto_next, Some(false));
    }
}
