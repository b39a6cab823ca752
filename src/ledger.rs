//! Ledger balance lookups.
//!
//! The server only ever asks the ledger one question: what are the
//! confirmed and unconfirmed balances of an address right now? The trait
//! keeps the payment monitor testable without sockets; the production
//! implementation speaks the esplora-style address API.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::PosError;

const COIN: f64 = 100_000_000.0;
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AddressBalance {
    pub confirmed: f64,
    pub unconfirmed: f64,
}

impl AddressBalance {
    /// Zero-confirmation settlement counts mempool funds, so callers
    /// compare against the combined balance.
    pub fn total(&self) -> f64 {
        self.confirmed + self.unconfirmed
    }
}

#[async_trait]
pub trait LedgerSource: Send + Sync {
    async fn balance(&self, address: &str) -> Result<AddressBalance, PosError>;
}

/// Esplora-style HTTP ledger client.
pub struct EsploraLedger {
    client: reqwest::Client,
    base_url: String,
}

impl EsploraLedger {
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(HTTP_TIMEOUT)
                .build()
                .unwrap_or_default(),
            base_url,
        }
    }
}

#[async_trait]
impl LedgerSource for EsploraLedger {
    async fn balance(&self, address: &str) -> Result<AddressBalance, PosError> {
        let url = format!("{}/address/{}", self.base_url, address);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| PosError::LedgerUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PosError::LedgerUnavailable(format!(
                "ledger returned {} for {}",
                response.status(),
                address
            )));
        }

        let info: serde_json::Value = response
            .json()
            .await
            .map_err(|e| PosError::LedgerUnavailable(e.to_string()))?;

        let net_sats = |stats: &serde_json::Value| {
            let funded = stats["funded_txo_sum"].as_u64().unwrap_or(0);
            let spent = stats["spent_txo_sum"].as_u64().unwrap_or(0);
            funded.saturating_sub(spent)
        };

        Ok(AddressBalance {
            confirmed: net_sats(&info["chain_stats"]) as f64 / COIN,
            unconfirmed: net_sats(&info["mempool_stats"]) as f64 / COIN,
        })
    }
}
