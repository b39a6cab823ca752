//! Fiat exchange-rate lookups.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::PosError;

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

#[async_trait]
pub trait RateSource: Send + Sync {
    /// Price of one native coin in `currency`.
    async fn price(&self, currency: &str) -> Result<f64, PosError>;
}

/// CoinGecko-style price client
/// (`GET {base}/simple/price?ids=bitcoin-cash&vs_currencies=eur`).
pub struct CoinGeckoRates {
    client: reqwest::Client,
    base_url: String,
}

impl CoinGeckoRates {
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
impl RateSource for CoinGeckoRates {
    async fn price(&self, currency: &str) -> Result<f64, PosError> {
        let vs = currency.to_lowercase();
        let url = format!(
            "{}/simple/price?ids=bitcoin-cash&vs_currencies={}",
            self.base_url, vs
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| PosError::RateUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PosError::RateUnavailable(format!(
                "rate source returned {}",
                response.status()
            )));
        }

        let quote: serde_json::Value = response
            .json()
            .await
            .map_err(|e| PosError::RateUnavailable(e.to_string()))?;

        match quote["bitcoin-cash"][vs.as_str()].as_f64() {
            Some(price) if price > 0.0 => Ok(price),
            _ => Err(PosError::RateUnavailable(format!(
                "no quote for {}",
                currency
            ))),
        }
    }
}
