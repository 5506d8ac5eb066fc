//! # HTTP Server Implementation
//!
//! Request layer over segment storage.
//!
//! | route | body / query | response |
//! |---|---|---|
//! | `POST /write` | one serialized record | `OK` once the record is on disk |
//! | `GET /scan` | `game`, `period`, optional `shard` | JSON array of records |
//! | `GET /healthz` | | `OK` |
//! | `GET /stats` | | metrics snapshot |

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use wagerlog_core::{
    config::StorageConfig,
    error::{Error, Result},
    metrics::{Metrics, MetricsSnapshot},
    Record,
};
use wagerlog_storage::{SegmentConfig, SegmentScanner};

use crate::registry::WriterRegistry;

// ========== API Types ==========

/// JSON view of a record; payload and hashes are hex
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiRecord {
    pub version: u8,
    pub flags: u8,
    pub machine_id: u64,
    pub game_code: u32,
    pub period_id: u32,
    pub seq_no: u32,
    pub bettor_id: u64,
    pub bet_time: u64,
    pub data: String,
    pub this_hash: String,
    pub chain_hash: String,
}

impl From<&Record> for ApiRecord {
    fn from(r: &Record) -> Self {
        Self {
            version: r.version,
            flags: r.flags,
            machine_id: r.machine_id,
            game_code: r.game_code,
            period_id: r.period_id,
            seq_no: r.seq_no,
            bettor_id: r.bettor_id,
            bet_time: r.bet_time,
            data: hex::encode(&r.data),
            this_hash: hex::encode(r.this_hash),
            chain_hash: hex::encode(r.chain_hash),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ScanParams {
    pub game: Option<String>,
    pub period: Option<String>,
    pub shard: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub version: &'static str,
    pub open_writers: usize,
    pub compression_ratio: f64,
    #[serde(flatten)]
    pub metrics: MetricsSnapshot,
}

// ========== Server State ==========

pub struct AppState {
    pub registry: WriterRegistry,
    pub scanner: SegmentScanner,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(config: &StorageConfig) -> Result<Self> {
        let metrics = Metrics::new();
        let segment_config = SegmentConfig::from_storage(config)?;
        Ok(Self {
            registry: WriterRegistry::new(
                &config.data_dir,
                config.shard,
                segment_config,
                metrics.clone(),
            )
            .with_flush_each_write(config.flush_each_write),
            scanner: SegmentScanner::new(&config.data_dir).with_metrics(metrics.clone()),
            metrics,
        })
    }
}

// ========== Routes ==========

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/write", post(write_record))
        .route("/scan", get(scan))
        .route("/stats", get(stats))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "OK"
}

async fn write_record(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> std::result::Result<&'static str, (StatusCode, String)> {
    let record =
        Record::parse(&body).map_err(|_| (StatusCode::BAD_REQUEST, "bad record".to_string()))?;

    let appended = tokio::task::spawn_blocking(move || state.registry.append(record))
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .map_err(internal)?;

    debug!(
        "Wrote game {} period {} seq {}",
        appended.game_code, appended.period_id, appended.seq_no
    );
    Ok("OK")
}

async fn scan(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ScanParams>,
) -> std::result::Result<Json<Vec<ApiRecord>>, (StatusCode, String)> {
    let bad = || (StatusCode::BAD_REQUEST, "game+period required".to_string());
    let game: u32 = params
        .game
        .as_deref()
        .and_then(|g| g.parse().ok())
        .ok_or_else(bad)?;
    let period: u32 = params
        .period
        .as_deref()
        .and_then(|p| p.parse().ok())
        .ok_or_else(bad)?;
    let shard = match params.shard.as_deref() {
        None | Some("") => None,
        Some(s) => Some(
            s.parse::<u32>()
                .map_err(|_| (StatusCode::BAD_REQUEST, "invalid shard".to_string()))?,
        ),
    };

    let mut stream = state
        .scanner
        .scan(game, period, shard)
        .await
        .map_err(internal)?;

    let mut records = Vec::new();
    while let Some(record) = stream.next().await {
        records.push(ApiRecord::from(&record));
    }
    Ok(Json(records))
}

async fn stats(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    let metrics = state.metrics.snapshot();
    Json(StatsResponse {
        version: wagerlog_core::VERSION,
        open_writers: state.registry.len(),
        compression_ratio: metrics.compression_ratio(),
        metrics,
    })
}

fn internal(e: Error) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}
