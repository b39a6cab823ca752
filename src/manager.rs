//! Point-of-sale manager - orchestration layer.
//!
//! Owns the address pool, the external clients and the transaction log,
//! and exposes the operations the API surface translates onto.

use std::fs;
use std::sync::Arc;

use crate::config::PosConfig;
use crate::error::PosError;
use crate::invoice::{self, InvoiceArtifact};
use crate::ledger::{EsploraLedger, LedgerSource};
use crate::monitor::{self, PaymentStatus};
use crate::pool::{AddressPool, RandomTags, TagSource};
use crate::rates::{CoinGeckoRates, RateSource};
use crate::report::{self, Report, Scope};
use crate::txlog::TransactionLog;

pub struct PosManager {
    pub config: PosConfig,
    pool: AddressPool,
    ledger: Arc<dyn LedgerSource>,
    rates: Arc<dyn RateSource>,
    txlog: TransactionLog,
}

impl PosManager {
    /// Build the manager from configuration: loads the fixed address set
    /// and wires up the HTTP clients.
    pub fn new(config: PosConfig) -> Result<Self, PosError> {
        let addresses = load_addresses(&config)?;
        let ledger = Arc::new(EsploraLedger::new(config.esplora_url.clone()));
        let rates = Arc::new(CoinGeckoRates::new(config.rate_url.clone()));
        Self::with_sources(config, addresses, ledger, rates, Box::new(RandomTags))
    }

    /// Build the manager with explicit sources (for testing).
    pub fn with_sources(
        config: PosConfig,
        addresses: Vec<String>,
        ledger: Arc<dyn LedgerSource>,
        rates: Arc<dyn RateSource>,
        tags: Box<dyn TagSource>,
    ) -> Result<Self, PosError> {
        if addresses.is_empty() {
            return Err(PosError::Internal(
                "address pool is empty; nothing to serve payments with".to_string(),
            ));
        }
        log::info!("Address pool holds {} addresses", addresses.len());

        let txlog = TransactionLog::new(config.data_dir.join("txlog"))?;
        Ok(Self {
            config,
            pool: AddressPool::new(addresses, tags),
            ledger,
            rates,
            txlog,
        })
    }

    pub async fn create_invoice(
        &self,
        fiat_amount: f64,
        currency: &str,
    ) -> Result<InvoiceArtifact, PosError> {
        invoice::create_invoice(
            &self.pool,
            self.rates.as_ref(),
            self.ledger.as_ref(),
            fiat_amount,
            currency,
        )
        .await
    }

    pub async fn check_payment(&self, tag: &str) -> Result<PaymentStatus, PosError> {
        monitor::check_payment(&self.pool, self.ledger.as_ref(), &self.txlog, tag).await
    }

    /// Cancel the session behind `tag`, releasing its address immediately.
    /// Idempotent: unknown or already-finished tags are a no-op. Returns
    /// whether a lock was actually released.
    pub fn cancel(&self, tag: &str) -> bool {
        match self.pool.take_by_tag(tag) {
            Some(lock) => {
                log::info!("Session {} cancelled, released {}", tag, lock.address);
                true
            }
            None => false,
        }
    }

    pub fn report(&self, scope: &str) -> Result<Report, PosError> {
        let scope = Scope::parse(scope)?;
        report::aggregate(&self.txlog, scope, self.config.week_start)
    }
}

fn load_addresses(config: &PosConfig) -> Result<Vec<String>, PosError> {
    let contents = fs::read_to_string(&config.address_file).map_err(|e| {
        PosError::Internal(format!(
            "cannot read address file {:?}: {}",
            config.address_file, e
        ))
    })?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect())
}
