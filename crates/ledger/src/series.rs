//! Running-balance series reconstruction.
//!
//! Pure functions over an entry history; nothing here touches the store.
//! `build_series` emits one point per entry. Calendar bucketing for chart
//! density is a presentation concern layered on top via [`bucket_daily`].

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::Entry;

/// Cumulative balance after applying one entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalancePoint {
    pub timestamp: DateTime<Utc>,
    pub running_balance: i64,
}

/// Folds an entry history into a chronologically ordered running-balance
/// trace.
///
/// Entries are sorted ascending by creation time, with the per-account
/// `seq` as a stable tie-break, then accumulated from zero. The output has
/// exactly one point per entry, in apply order; it is empty iff the input
/// is empty. The computation is deterministic: the same input always yields
/// the same output.
pub fn build_series(entries: &[Entry]) -> Vec<BalancePoint> {
    let mut ordered: Vec<&Entry> = entries.iter().collect();
    ordered.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.seq.cmp(&b.seq))
    });

    let mut running = 0i64;
    ordered
        .into_iter()
        .map(|entry| {
            running += entry.signed_amount();
            BalancePoint {
                timestamp: entry.created_at,
                running_balance: running,
            }
        })
        .collect()
}

/// Collapses a per-entry series to one point per UTC calendar day, keeping
/// the last running balance of each day.
///
/// Expects the input ordered as produced by [`build_series`].
pub fn bucket_daily(points: &[BalancePoint]) -> Vec<(NaiveDate, i64)> {
    let mut out: Vec<(NaiveDate, i64)> = Vec::new();
    for point in points {
        let date = point.timestamp.date_naive();
        match out.last_mut() {
            Some((last_date, balance)) if *last_date == date => *balance = point.running_balance,
            _ => out.push((date, point.running_balance)),
        }
    }
    out
}
