//! End-to-end payment flow against in-process ledger and rate stubs.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use pos_server::config::PosConfig;
use pos_server::error::PosError;
use pos_server::ledger::{AddressBalance, LedgerSource};
use pos_server::manager::PosManager;
use pos_server::monitor::PaymentStatus;
use pos_server::pool::RandomTags;
use pos_server::rates::RateSource;

/// Ledger stub with per-address balances that tests adjust as "the
/// customer pays".
struct FakeLedger {
    balances: Mutex<HashMap<String, AddressBalance>>,
    down: Mutex<bool>,
}

impl FakeLedger {
    fn new() -> Self {
        Self {
            balances: Mutex::new(HashMap::new()),
            down: Mutex::new(false),
        }
    }

    fn fund(&self, address: &str, confirmed: f64, unconfirmed: f64) {
        self.balances.lock().unwrap().insert(
            address.to_string(),
            AddressBalance {
                confirmed,
                unconfirmed,
            },
        );
    }

    fn set_down(&self, down: bool) {
        *self.down.lock().unwrap() = down;
    }
}

#[async_trait]
impl LedgerSource for FakeLedger {
    async fn balance(&self, address: &str) -> Result<AddressBalance, PosError> {
        if *self.down.lock().unwrap() {
            return Err(PosError::LedgerUnavailable("fake ledger down".to_string()));
        }
        Ok(self
            .balances
            .lock()
            .unwrap()
            .get(address)
            .copied()
            .unwrap_or(AddressBalance {
                confirmed: 0.0,
                unconfirmed: 0.0,
            }))
    }
}

/// Wraps [`FakeLedger`] with scheduler yield points inside `balance()`,
/// so two concurrent polls of the same tag interleave around the query.
struct YieldingLedger {
    inner: Arc<FakeLedger>,
}

#[async_trait]
impl LedgerSource for YieldingLedger {
    async fn balance(&self, address: &str) -> Result<AddressBalance, PosError> {
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        self.inner.balance(address).await
    }
}

struct FixedRate(f64);

#[async_trait]
impl RateSource for FixedRate {
    async fn price(&self, _currency: &str) -> Result<f64, PosError> {
        Ok(self.0)
    }
}

struct DownRate;

#[async_trait]
impl RateSource for DownRate {
    async fn price(&self, currency: &str) -> Result<f64, PosError> {
        Err(PosError::RateUnavailable(format!("no quote for {}", currency)))
    }
}

struct TestEnvironment {
    _temp_dir: TempDir,
    manager: PosManager,
    ledger: Arc<FakeLedger>,
}

impl TestEnvironment {
    fn new(addresses: &[&str], rates: Arc<dyn RateSource>) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let config = PosConfig {
            data_dir: temp_dir.path().to_path_buf(),
            ..Default::default()
        };
        let ledger = Arc::new(FakeLedger::new());
        let manager = PosManager::with_sources(
            config,
            addresses.iter().map(|a| a.to_string()).collect(),
            ledger.clone(),
            rates,
            Box::new(RandomTags),
        )
        .unwrap();
        Self {
            _temp_dir: temp_dir,
            manager,
            ledger,
        }
    }
}

#[tokio::test]
async fn zero_confirmation_payment_flow() {
    let env = TestEnvironment::new(&["bitcoincash:qA"], Arc::new(FixedRate(250.0)));
    env.ledger.fund("bitcoincash:qA", 1.0, 0.0);

    // 2.50 EUR at 250 EUR/coin is 0.01 native.
    let invoice = env.manager.create_invoice(2.5, "eur").await.unwrap();
    assert_eq!(invoice.address, "bitcoincash:qA");
    assert_eq!(invoice.currency, "EUR");
    assert_eq!(invoice.baseline_balance, 1.0);
    assert!((invoice.native_amount - 0.01).abs() < 1e-12);
    assert_eq!(invoice.tag.len(), 8);
    assert!(invoice
        .payment_uri
        .starts_with("bitcoincash:qA?amount=0.01000000&label="));

    // Nothing has moved yet.
    let status = env.manager.check_payment(&invoice.tag).await.unwrap();
    assert_eq!(status, PaymentStatus::Pending);

    // Customer broadcast lands in the mempool.
    env.ledger.fund("bitcoincash:qA", 1.0, 0.01);
    let status = env.manager.check_payment(&invoice.tag).await.unwrap();
    assert_eq!(status, PaymentStatus::Confirmed);

    // Today's report carries the fiat total and the session tag.
    let today = chrono::Local::now().date_naive().format("%Y-%m-%d").to_string();
    let report = env.manager.report(&today).unwrap();
    assert_eq!(report.totals["EUR"], 2.5);
    assert_eq!(report.entries.len(), 1);

    // The address is allocatable again.
    let next = env.manager.create_invoice(1.0, "EUR").await.unwrap();
    assert_eq!(next.address, "bitcoincash:qA");
}

#[tokio::test]
async fn exhausted_pool_is_a_retryable_error() {
    let env = TestEnvironment::new(&["bitcoincash:qA"], Arc::new(FixedRate(250.0)));
    env.manager.create_invoice(2.5, "EUR").await.unwrap();

    let err = env.manager.create_invoice(2.5, "EUR").await.unwrap_err();
    assert!(matches!(err, PosError::NoAddressAvailable));
}

#[tokio::test]
async fn failed_baseline_fetch_does_not_strand_the_address() {
    let env = TestEnvironment::new(&["bitcoincash:qA"], Arc::new(FixedRate(250.0)));

    env.ledger.set_down(true);
    let err = env.manager.create_invoice(2.5, "EUR").await.unwrap_err();
    assert!(matches!(err, PosError::LedgerUnavailable(_)));

    // The single address went back to the pool, so a retry succeeds.
    env.ledger.set_down(false);
    let invoice = env.manager.create_invoice(2.5, "EUR").await.unwrap();
    assert_eq!(invoice.address, "bitcoincash:qA");
}

#[tokio::test]
async fn rate_failure_leaves_the_pool_untouched() {
    let env = TestEnvironment::new(&["bitcoincash:qA"], Arc::new(DownRate));
    let err = env.manager.create_invoice(2.5, "EUR").await.unwrap_err();
    assert!(matches!(err, PosError::RateUnavailable(_)));

    // No allocation happened before the rate lookup failed.
    let env2 = TestEnvironment::new(&["bitcoincash:qA"], Arc::new(FixedRate(250.0)));
    let invoice = env2.manager.create_invoice(2.5, "EUR").await.unwrap();
    assert_eq!(invoice.address, "bitcoincash:qA");
}

#[tokio::test]
async fn cancel_releases_the_lock_immediately() {
    let env = TestEnvironment::new(&["bitcoincash:qA"], Arc::new(FixedRate(250.0)));
    let invoice = env.manager.create_invoice(2.5, "EUR").await.unwrap();

    assert!(env.manager.cancel(&invoice.tag));
    // Idempotent: a second cancel is a no-op.
    assert!(!env.manager.cancel(&invoice.tag));

    let status = env.manager.check_payment(&invoice.tag).await.unwrap();
    assert_eq!(status, PaymentStatus::NotFoundOrExpired);

    let next = env.manager.create_invoice(2.5, "EUR").await.unwrap();
    assert_eq!(next.address, "bitcoincash:qA");
}

#[tokio::test]
async fn ledger_outage_while_polling_reads_as_pending() {
    let env = TestEnvironment::new(&["bitcoincash:qA"], Arc::new(FixedRate(250.0)));
    let invoice = env.manager.create_invoice(2.5, "EUR").await.unwrap();

    env.ledger.set_down(true);
    let status = env.manager.check_payment(&invoice.tag).await.unwrap();
    assert_eq!(status, PaymentStatus::Pending);
}

#[tokio::test]
async fn concurrent_confirmations_write_intact_records() {
    let env = TestEnvironment::new(
        &["bitcoincash:qA", "bitcoincash:qB"],
        Arc::new(FixedRate(100.0)),
    );

    let first = env.manager.create_invoice(1.0, "EUR").await.unwrap();
    let second = env.manager.create_invoice(2.0, "EUR").await.unwrap();
    assert_ne!(first.address, second.address);

    env.ledger.fund(&first.address, 0.0, 0.01);
    env.ledger.fund(&second.address, 0.0, 0.02);

    let (a, b) = tokio::join!(
        env.manager.check_payment(&first.tag),
        env.manager.check_payment(&second.tag),
    );
    assert_eq!(a.unwrap(), PaymentStatus::Confirmed);
    assert_eq!(b.unwrap(), PaymentStatus::Confirmed);

    let today = chrono::Local::now().date_naive().format("%Y-%m-%d").to_string();
    let report = env.manager.report(&today).unwrap();
    assert_eq!(report.entries.len(), 2);
    assert_eq!(report.totals["EUR"], 3.0);
}

#[tokio::test]
async fn racing_polls_record_a_payment_once() {
    let temp_dir = TempDir::new().unwrap();
    let config = PosConfig {
        data_dir: temp_dir.path().to_path_buf(),
        ..Default::default()
    };
    let funds = Arc::new(FakeLedger::new());
    let manager = PosManager::with_sources(
        config,
        vec!["bitcoincash:qA".to_string()],
        Arc::new(YieldingLedger {
            inner: funds.clone(),
        }),
        Arc::new(FixedRate(250.0)),
        Box::new(RandomTags),
    )
    .unwrap();

    let invoice = manager.create_invoice(2.5, "EUR").await.unwrap();
    funds.fund("bitcoincash:qA", 0.0, 0.01);

    // Both polls see the funded balance; only one may take the lock and
    // write to the system of record.
    let (a, b) = tokio::join!(
        manager.check_payment(&invoice.tag),
        manager.check_payment(&invoice.tag),
    );
    let statuses = [a.unwrap(), b.unwrap()];
    assert!(statuses.contains(&PaymentStatus::Confirmed));

    let today = chrono::Local::now().date_naive().format("%Y-%m-%d").to_string();
    let report = manager.report(&today).unwrap();
    assert_eq!(report.entries.len(), 1);
    assert_eq!(report.totals["EUR"], 2.5);
}

#[tokio::test]
async fn malformed_report_scope_is_rejected() {
    let env = TestEnvironment::new(&["bitcoincash:qA"], Arc::new(FixedRate(250.0)));
    let err = env.manager.report("2023-13").unwrap_err();
    assert!(matches!(err, PosError::InvalidScope(_)));
}

#[tokio::test]
async fn invalid_amount_is_rejected_before_any_allocation() {
    let env = TestEnvironment::new(&["bitcoincash:qA"], Arc::new(FixedRate(250.0)));
    for amount in [0.0, -1.0, f64::NAN] {
        let err = env.manager.create_invoice(amount, "EUR").await.unwrap_err();
        assert!(matches!(err, PosError::InvalidInput(_)));
    }
    let err = env.manager.create_invoice(1.0, "EU1").await.unwrap_err();
    assert!(matches!(err, PosError::InvalidInput(_)));
}
