//! Mock of the esplora address API subset the payment server consumes.
//!
//! Balances live in memory and are adjusted over HTTP, so an end-to-end
//! payment flow can be driven by hand:
//!
//! ```bash
//! cargo run -p ledger-mock
//! curl localhost:3001/address/bitcoincash:qA
//! curl -X POST localhost:3001/address/bitcoincash:qA/fund \
//!     -H 'content-type: application/json' -d '{"mempool_sat": 1000000}'
//! ```

use std::collections::HashMap;
use std::env;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

#[derive(Default, Clone, Copy)]
struct Funds {
    confirmed_sat: u64,
    mempool_sat: u64,
}

type AppState = Arc<Mutex<HashMap<String, Funds>>>;

#[derive(Debug, Deserialize)]
struct FundRequest {
    #[serde(default)]
    confirmed_sat: u64,
    #[serde(default)]
    mempool_sat: u64,
}

/// GET /address/{addr}
/// Esplora-shaped stats for an address; unknown addresses report zero.
async fn get_address(
    State(state): State<AppState>,
    Path(addr): Path<String>,
) -> Json<serde_json::Value> {
    let funds = state
        .lock()
        .unwrap()
        .get(&addr)
        .copied()
        .unwrap_or_default();

    Json(json!({
        "address": addr,
        "chain_stats": {
            "funded_txo_sum": funds.confirmed_sat,
            "spent_txo_sum": 0,
            "tx_count": if funds.confirmed_sat > 0 { 1 } else { 0 },
        },
        "mempool_stats": {
            "funded_txo_sum": funds.mempool_sat,
            "spent_txo_sum": 0,
            "tx_count": if funds.mempool_sat > 0 { 1 } else { 0 },
        },
    }))
}

/// POST /address/{addr}/fund
/// Adds satoshis to an address, simulating an incoming payment.
async fn fund_address(
    State(state): State<AppState>,
    Path(addr): Path<String>,
    Json(req): Json<FundRequest>,
) -> Json<serde_json::Value> {
    let mut balances = state.lock().unwrap();
    let funds = balances.entry(addr.clone()).or_default();
    funds.confirmed_sat += req.confirmed_sat;
    funds.mempool_sat += req.mempool_sat;
    log::info!(
        "Funded {}: confirmed={} mempool={}",
        addr,
        funds.confirmed_sat,
        funds.mempool_sat
    );

    Json(json!({
        "address": addr,
        "confirmed_sat": funds.confirmed_sat,
        "mempool_sat": funds.mempool_sat,
    }))
}

async fn health() -> &'static str {
    "ok"
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let addr = env::var("BIND_ADDRESS").unwrap_or_else(|_| "127.0.0.1:3001".to_string());
    let state: AppState = Arc::new(Mutex::new(HashMap::new()));

    let app = Router::new()
        .route("/address/:addr", get(get_address))
        .route("/address/:addr/fund", post(fund_address))
        .route("/health", get(health))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::info!("Ledger mock listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
