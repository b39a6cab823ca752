//! Append-only per-day transaction log.
//!
//! One file per local calendar day under `<data>/txlog/`. Records are
//! tab-separated lines and are never rewritten; only the file for "today"
//! is ever appended to.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{Local, NaiveDate, SecondsFormat};
use serde::Serialize;

use crate::error::PosError;

/// Wire format, kept stable for compatibility with existing log files:
/// `timestamp TAB address TAB native_amount TAB "fiat CUR" TAB tag`.
const FIELDS_MIN: usize = 4;
const FIELDS_MAX: usize = 5;

/// A confirmed payment about to be recorded.
pub struct TxRecord<'a> {
    pub address: &'a str,
    /// Native amount in the ledger's base unit.
    pub amount: f64,
    pub fiat_amount: f64,
    pub currency: &'a str,
    pub tag: &'a str,
}

/// A record read back from a day's store.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub address: String,
    /// Native amount as decimal text, exactly as written.
    pub amount: String,
    pub fiat_amount: f64,
    pub currency: String,
    pub tag: String,
}

pub struct TransactionLog {
    dir: PathBuf,
    // Serializes appends from concurrent confirmations into today's file.
    append_guard: Mutex<()>,
}

impl TransactionLog {
    pub fn new(dir: PathBuf) -> Result<Self, PosError> {
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            append_guard: Mutex::new(()),
        })
    }

    /// Path of the store for a given calendar day.
    pub fn day_path(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(format!("{}.log", date.format("%Y-%m-%d")))
    }

    /// Append one confirmed payment to today's store. The day is the local
    /// date of this write, not of the original invoice.
    pub fn append(&self, record: &TxRecord) -> Result<(), PosError> {
        let now = Local::now();
        let line = format!(
            "{}\t{}\t{:.8}\t{:.2} {}\t{}\n",
            now.to_rfc3339_opts(SecondsFormat::Secs, false),
            record.address,
            record.amount,
            record.fiat_amount,
            record.currency,
            record.tag,
        );

        let guard = self.append_guard.lock().unwrap();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.day_path(now.date_naive()))?;
        file.write_all(line.as_bytes())?;
        drop(guard);

        log::debug!("Logged payment of {:.8} to {}", record.amount, record.address);
        Ok(())
    }

    /// Read all records of one day's store, in file order.
    ///
    /// A missing file is an empty day. A line that does not match the
    /// expected field shape marks the whole day as corrupted; callers
    /// surface that without aborting other days.
    pub fn read_day(&self, date: NaiveDate) -> Result<Vec<LogEntry>, PosError> {
        let path = self.day_path(date);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let corrupt = || PosError::LogCorruption(date.format("%Y-%m-%d").to_string());

        let contents = fs::read_to_string(&path)?;
        let mut entries = Vec::new();
        for line in contents.lines() {
            if line.is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() < FIELDS_MIN || fields.len() > FIELDS_MAX {
                log::warn!("Malformed record in {:?}: {} fields", path, fields.len());
                return Err(corrupt());
            }

            let (fiat_amount, currency) = match fields[3].split_once(' ') {
                Some((amount, cur)) => match amount.parse::<f64>() {
                    Ok(v) => (v, cur.to_string()),
                    Err(_) => return Err(corrupt()),
                },
                None => return Err(corrupt()),
            };

            entries.push(LogEntry {
                timestamp: fields[0].to_string(),
                address: fields[1].to_string(),
                amount: fields[2].to_string(),
                fiat_amount,
                currency,
                tag: fields.get(4).unwrap_or(&"").to_string(),
            });
        }
        Ok(entries)
    }
}
