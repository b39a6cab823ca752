//! Report aggregation over calendar scopes.
//!
//! Resolves a scope identifier to its member days, unions the transaction
//! log entries of those days and sums fiat totals per currency. A corrupted
//! day store contributes a visible marker to the listing without zeroing
//! out the other days' totals.

pub mod scope;

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::PosError;
use crate::txlog::{LogEntry, TransactionLog};

pub use scope::{Scope, ScopeLinks, WeekStart};

/// One line of a report listing: either a logged payment or an error
/// marker for a day whose store could not be read.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportLine {
    Entry {
        #[serde(flatten)]
        entry: LogEntry,
    },
    CorruptDay {
        date: String,
    },
}

#[derive(Debug, Serialize)]
pub struct Report {
    pub scope: String,
    pub granularity: &'static str,
    /// Fiat totals per currency over all readable member days.
    pub totals: BTreeMap<String, f64>,
    pub entries: Vec<ReportLine>,
    pub prev: Option<String>,
    pub next: Option<String>,
    pub links: ScopeLinks,
}

/// Aggregate the log entries of every member day of `scope`, in
/// chronological file order.
pub fn aggregate(
    txlog: &TransactionLog,
    scope: Scope,
    week_start: WeekStart,
) -> Result<Report, PosError> {
    let mut totals: BTreeMap<String, f64> = BTreeMap::new();
    let mut entries = Vec::new();

    for day in scope.days(week_start) {
        match txlog.read_day(day) {
            Ok(records) => {
                for entry in records {
                    *totals.entry(entry.currency.clone()).or_insert(0.0) += entry.fiat_amount;
                    entries.push(ReportLine::Entry { entry });
                }
            }
            Err(PosError::LogCorruption(date)) => {
                log::warn!("Skipping corrupted log store for {}", date);
                entries.push(ReportLine::CorruptDay { date });
            }
            Err(e) => return Err(e),
        }
    }

    Ok(Report {
        scope: scope.label(),
        granularity: scope.granularity(),
        totals,
        entries,
        prev: scope.prev().map(|s| s.label()),
        next: scope.next().map(|s| s.label()),
        links: scope.links(),
    })
}
