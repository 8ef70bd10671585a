//! Aggregation engine: summary statistics and time series over parsed
//! statements.
//!
//! Pure and deterministic. The dashboard recomputes the snapshot on every
//! view rather than caching it; volumes are bounded by a user's own
//! statements, so the recomputation cost is accepted.

use std::collections::HashMap;

use serde::Serialize;

use crate::dates;
use crate::statement::{ParseState, ParsedStatementGroup};

/// How many expense buckets the ranking keeps.
pub const TOP_EXPENSE_COUNT: usize = 5;

/// Bucket label for entries with no description.
pub const UNKNOWN_DESCRIPTION: &str = "(unknown)";

/// One bucket in the top-spend ranking: total spend per description.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpenseBucket {
    pub description: String,
    pub amount: f64,
}

/// Derived summary view over a set of parsed statements. Recomputed on
/// demand, never persisted.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AggregateSnapshot {
    /// Net of all entries: income minus expenses.
    pub total_signed: f64,
    pub total_income: f64,
    /// Magnitude of all expense flow (non-negative).
    pub total_expenses: f64,
    /// Largest single expense, 0 when there are none.
    pub biggest_expense: f64,
    /// Up to [`TOP_EXPENSE_COUNT`] buckets, largest first.
    pub top_expenses: Vec<ExpenseBucket>,
    /// Cumulative signed sum in chronological order, one point per entry.
    pub running_balance: Vec<f64>,
}

/// One entry in the flattened, date-sorted timeline, with a back-reference
/// to the statement it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineEntry {
    pub date: String,
    pub sort_key: i64,
    pub value: f64,
    pub signed: f64,
    pub is_expense: bool,
    pub description: String,
    pub statement_name: String,
}

/// Flatten all groups' entries into one chronologically sorted sequence.
///
/// Groups whose parse never ran are skipped. The sort is stable and keys on
/// the parsed date; rows with unparsable dates keep key 0 and therefore sort
/// first. Magnitudes are normalized defensively so dirty data degrades to
/// zero instead of poisoning the sums.
pub fn timeline(groups: &[ParsedStatementGroup]) -> Vec<TimelineEntry> {
    let mut entries: Vec<TimelineEntry> = Vec::new();

    for group in groups {
        let ParseState::Parsed(parsed) = &group.parsed else {
            continue;
        };
        for e in parsed {
            let value = if e.value.is_finite() { e.value.abs() } else { 0.0 };
            let signed = if e.is_expense { -value } else { value };
            entries.push(TimelineEntry {
                date: e.date.clone(),
                sort_key: dates::sort_key_millis(&e.date),
                value,
                signed,
                is_expense: e.is_expense,
                description: e.description.clone(),
                statement_name: group.statement_name.clone(),
            });
        }
    }

    entries.sort_by_key(|e| e.sort_key);
    entries
}

/// Compute the dashboard snapshot for a set of parsed statement groups.
///
/// All sums run in the fixed date-sorted order, so repeated calls over the
/// same input produce identical output down to float summation effects.
pub fn aggregate(groups: &[ParsedStatementGroup]) -> AggregateSnapshot {
    let entries = timeline(groups);

    let mut total_signed = 0.0;
    let mut total_income = 0.0;
    let mut negative_sum = 0.0;
    let mut biggest_expense: f64 = 0.0;
    let mut running_balance = Vec::with_capacity(entries.len());

    // Ordered bucket accumulation: insertion order is the tie-break when two
    // buckets sum to the same amount, so a HashMap only carries the index.
    let mut buckets: Vec<ExpenseBucket> = Vec::new();
    let mut bucket_index: HashMap<String, usize> = HashMap::new();

    for e in &entries {
        total_signed += e.signed;
        if e.signed > 0.0 {
            total_income += e.signed;
        } else if e.signed < 0.0 {
            negative_sum += e.signed;
        }
        running_balance.push(total_signed);

        if e.is_expense {
            if e.value > biggest_expense {
                biggest_expense = e.value;
            }
            let key = if e.description.is_empty() {
                UNKNOWN_DESCRIPTION
            } else {
                e.description.as_str()
            };
            match bucket_index.get(key) {
                Some(&i) => buckets[i].amount += e.value,
                None => {
                    bucket_index.insert(key.to_string(), buckets.len());
                    buckets.push(ExpenseBucket {
                        description: key.to_string(),
                        amount: e.value,
                    });
                }
            }
        }
    }

    // Stable sort: equal sums keep first-encountered order.
    buckets.sort_by(|a, b| {
        b.amount
            .partial_cmp(&a.amount)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    buckets.truncate(TOP_EXPENSE_COUNT);

    AggregateSnapshot {
        total_signed,
        total_income,
        total_expenses: negative_sum.abs(),
        biggest_expense,
        top_expenses: buckets,
        running_balance,
    }
}
