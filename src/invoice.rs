//! Invoice creation.
//!
//! Binds a free receiving address to a new payment session: fetches the
//! fiat price, snapshots the address's ledger balance as the baseline and
//! creates the lock the payment monitor will poll against. Both network
//! calls happen outside the pool mutex; a failed baseline fetch releases
//! the address so no failure path can strand one.

use serde::Serialize;

use crate::error::PosError;
use crate::ledger::LedgerSource;
use crate::pool::AddressPool;
use crate::rates::RateSource;

/// Everything a client needs to present a payment request. The payment URI
/// is consumed by QR/template layers outside this crate.
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceArtifact {
    pub address: String,
    pub native_amount: f64,
    pub fiat_amount: f64,
    pub currency: String,
    pub baseline_balance: f64,
    pub tag: String,
    pub payment_uri: String,
}

pub async fn create_invoice(
    pool: &AddressPool,
    rates: &dyn RateSource,
    ledger: &dyn LedgerSource,
    fiat_amount: f64,
    currency: &str,
) -> Result<InvoiceArtifact, PosError> {
    if !(fiat_amount > 0.0) {
        return Err(PosError::InvalidInput(format!(
            "amount must be positive, got {}",
            fiat_amount
        )));
    }
    if currency.is_empty() || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(PosError::InvalidInput(format!(
            "invalid currency code: {:?}",
            currency
        )));
    }
    let currency = currency.to_uppercase();

    // Evict expired locks and bail early while the pool is drained; the
    // rate lookup is not worth its latency when no address can be served.
    if pool.available() == 0 {
        return Err(PosError::NoAddressAvailable);
    }

    let price = rates.price(&currency).await?;
    let native_amount = fiat_amount / price;

    let address = pool.allocate()?;

    // Baseline must be attributed to this lock before any customer funds
    // can arrive. On failure the address goes straight back to the pool.
    let baseline_balance = match ledger.balance(&address).await {
        Ok(balance) => balance.total(),
        Err(e) => {
            log::warn!("Baseline fetch failed for {}, releasing: {}", address, e);
            pool.release(&address);
            return Err(e);
        }
    };

    let tag = pool.lock(&address, native_amount, fiat_amount, &currency, baseline_balance);
    let payment_uri = format!("{}?amount={:.8}&label={}", address, native_amount, tag);

    log::info!(
        "Invoice {}: {:.8} ({} {}) to {}",
        tag,
        native_amount,
        fiat_amount,
        currency,
        address
    );

    Ok(InvoiceArtifact {
        address,
        native_amount,
        fiat_amount,
        currency,
        baseline_balance,
        tag,
        payment_uri,
    })
}
