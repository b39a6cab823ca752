//! Payment-confirmation polling.
//!
//! Zero-confirmation detection: the unconfirmed mempool balance counts
//! toward settlement, trading finality for speed, which fits low-value
//! point-of-sale payments.

use crate::error::PosError;
use crate::ledger::LedgerSource;
use crate::pool::AddressPool;
use crate::txlog::{TransactionLog, TxRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    Pending,
    Confirmed,
    NotFoundOrExpired,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Confirmed => "confirmed",
            PaymentStatus::NotFoundOrExpired => "expired",
        }
    }
}

/// Check whether the session behind `tag` has been paid.
///
/// An expired lock yields `NotFoundOrExpired` but is left in place:
/// reclamation stays with the lazy scan in the pool's allocation path.
/// A ledger failure is logged and reported as `Pending`; the client is
/// expected to poll again.
pub async fn check_payment(
    pool: &AddressPool,
    ledger: &dyn LedgerSource,
    txlog: &TransactionLog,
    tag: &str,
) -> Result<PaymentStatus, PosError> {
    let lock = match pool.resolve(tag) {
        Some(lock) => lock,
        None => return Ok(PaymentStatus::NotFoundOrExpired),
    };
    if lock.is_expired() {
        return Ok(PaymentStatus::NotFoundOrExpired);
    }

    let balance = match ledger.balance(&lock.address).await {
        Ok(balance) => balance,
        Err(e) => {
            log::warn!("Ledger check failed for {}: {}", lock.address, e);
            return Ok(PaymentStatus::Pending);
        }
    };

    if balance.total() >= lock.baseline_balance + lock.expected_amount {
        // Only the poll that actually removes the lock records the
        // payment; a racing poll, cancel or eviction that got there first
        // already ended the session.
        let lock = match pool.take_by_tag(tag) {
            Some(lock) => lock,
            None => return Ok(PaymentStatus::NotFoundOrExpired),
        };
        txlog.append(&TxRecord {
            address: &lock.address,
            amount: lock.expected_amount,
            fiat_amount: lock.fiat_amount,
            currency: &lock.currency,
            tag: &lock.tag,
        })?;
        log::info!(
            "Payment confirmed on {}: {:.8} (session {})",
            lock.address,
            lock.expected_amount,
            tag
        );
        return Ok(PaymentStatus::Confirmed);
    }

    Ok(PaymentStatus::Pending)
}
