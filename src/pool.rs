//! Receiving-address pool and lock state machine.
//!
//! Every address is either free (sitting in the FIFO pool) or bound to
//! exactly one active [`Lock`]. Allocation, lock creation, release and the
//! lazy eviction of expired locks all run under one mutex, so two concurrent
//! invoice requests can never be handed the same address.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use rand::Rng;

use crate::error::PosError;

/// Fixed lock lifetime, measured from lock creation. Polling a session does
/// not extend it; the payment window advertised to the customer is exactly
/// this long.
pub const LOCK_TIMEOUT: Duration = Duration::from_secs(60);

const TAG_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const TAG_LEN: usize = 8;

/// Source of session tags. Injectable so tests can run deterministically.
pub trait TagSource: Send + Sync {
    fn next_tag(&self) -> String;
}

/// Default tag source backed by the thread-local RNG.
pub struct RandomTags;

impl TagSource for RandomTags {
    fn next_tag(&self) -> String {
        let mut rng = rand::thread_rng();
        (0..TAG_LEN)
            .map(|_| TAG_ALPHABET[rng.gen_range(0..TAG_ALPHABET.len())] as char)
            .collect()
    }
}

/// One invoice session bound to a receiving address.
#[derive(Debug, Clone)]
pub struct Lock {
    pub address: String,
    pub created_at: Instant,
    /// Expected payment in the ledger's base unit.
    pub expected_amount: f64,
    pub fiat_amount: f64,
    pub currency: String,
    /// Confirmed + unconfirmed balance snapshot taken at allocation time.
    pub baseline_balance: f64,
    pub tag: String,
}

impl Lock {
    pub fn is_expired(&self) -> bool {
        self.created_at.elapsed() >= LOCK_TIMEOUT
    }
}

#[derive(Default)]
struct PoolState {
    free: VecDeque<String>,
    locks: HashMap<String, Lock>,
}

pub struct AddressPool {
    state: Mutex<PoolState>,
    tags: Box<dyn TagSource>,
}

impl AddressPool {
    /// Build a pool over the fixed address set. Addresses are never created
    /// or destroyed after this point.
    pub fn new(addresses: Vec<String>, tags: Box<dyn TagSource>) -> Self {
        Self {
            state: Mutex::new(PoolState {
                free: addresses.into(),
                locks: HashMap::new(),
            }),
            tags,
        }
    }

    /// Evict expired locks, then report how many addresses are free.
    ///
    /// This scan is the only place expired locks are reclaimed; a session
    /// that merely polls an expired tag leaves its lock in place until the
    /// next allocation attempt comes through here.
    pub fn available(&self) -> usize {
        let mut state = self.state.lock().unwrap();
        Self::evict_expired(&mut state);
        state.free.len()
    }

    /// Take the address at the front of the FIFO, evicting expired locks
    /// first. Recently released addresses sit at the back and are reused
    /// last, which spreads ledger-query load across the pool.
    pub fn allocate(&self) -> Result<String, PosError> {
        let mut state = self.state.lock().unwrap();
        Self::evict_expired(&mut state);
        state.free.pop_front().ok_or(PosError::NoAddressAvailable)
    }

    /// Bind a lock to an allocated address and return its session tag.
    ///
    /// Calling this again for an address that is already locked returns the
    /// existing tag without touching the creation timestamp: expiry is fixed
    /// from creation, never refreshed.
    pub fn lock(
        &self,
        address: &str,
        expected_amount: f64,
        fiat_amount: f64,
        currency: &str,
        baseline_balance: f64,
    ) -> String {
        let mut state = self.state.lock().unwrap();
        if let Some(existing) = state.locks.get(address) {
            return existing.tag.clone();
        }
        let tag = self.tags.next_tag();
        state.locks.insert(
            address.to_string(),
            Lock {
                address: address.to_string(),
                created_at: Instant::now(),
                expected_amount,
                fiat_amount,
                currency: currency.to_string(),
                baseline_balance,
                tag: tag.clone(),
            },
        );
        tag
    }

    /// Drop the lock (if any) and return the address to the back of the
    /// pool. Idempotent: releasing an already-free address is a no-op.
    pub fn release(&self, address: &str) {
        let mut state = self.state.lock().unwrap();
        state.locks.remove(address);
        if !state.free.iter().any(|a| a == address) {
            state.free.push_back(address.to_string());
        }
    }

    /// Remove the lock carrying `tag` and return its address to the back
    /// of the pool, all under the pool mutex. Returns the removed lock, or
    /// `None` when the session already ended (confirmed by a racing poll,
    /// cancelled, or evicted). A stale tag can never release a newer
    /// session's lock on the same address.
    pub fn take_by_tag(&self, tag: &str) -> Option<Lock> {
        let mut state = self.state.lock().unwrap();
        let address = state
            .locks
            .values()
            .find(|l| l.tag == tag)?
            .address
            .clone();
        let lock = state.locks.remove(&address);
        if !state.free.iter().any(|a| a == &address) {
            state.free.push_back(address);
        }
        lock
    }

    /// Find the active lock carrying `tag`. Returns `None` both for tags
    /// that never existed and for locks already evicted.
    pub fn resolve(&self, tag: &str) -> Option<Lock> {
        let state = self.state.lock().unwrap();
        state.locks.values().find(|l| l.tag == tag).cloned()
    }

    /// True when the address carries no lock, or its lock has aged past
    /// [`LOCK_TIMEOUT`].
    pub fn is_expired(&self, address: &str) -> bool {
        let state = self.state.lock().unwrap();
        match state.locks.get(address) {
            Some(lock) => lock.is_expired(),
            None => true,
        }
    }

    fn evict_expired(state: &mut PoolState) {
        let expired: Vec<String> = state
            .locks
            .values()
            .filter(|l| l.is_expired())
            .map(|l| l.address.clone())
            .collect();
        for address in expired {
            log::info!("Evicting expired lock on {}", address);
            state.locks.remove(&address);
            state.free.push_back(address);
        }
    }

    #[cfg(test)]
    pub(crate) fn backdate(&self, tag: &str, by: Duration) {
        let mut state = self.state.lock().unwrap();
        for lock in state.locks.values_mut() {
            if lock.tag == tag {
                lock.created_at = Instant::now() - by;
            }
        }
    }
}
