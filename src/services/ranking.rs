use std::cmp::Ordering;
use std::collections::HashSet;

use crate::types::models::{
    AnnotatedRow, ChangeAnnotatedView, ChangeColumn, CoinRecord, RankedView, Snapshot, Timeframe,
};

/// Numeric column a display sort can key on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Price,
    Volume24h,
    Change(Timeframe),
    YtdChange,
}

impl SortKey {
    pub fn value(self, record: &CoinRecord) -> f64 {
        match self {
            SortKey::Price => record.price,
            SortKey::Volume24h => record.volume_24h,
            SortKey::Change(timeframe) => record.percent_change.get(timeframe),
            SortKey::YtdChange => record.ytd_percent_change,
        }
    }
}

/// Orders two metric values. NaN goes last in either direction.
pub fn compare_metric(a: f64, b: f64, ascending: bool) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) if ascending => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}

/// First `n` rows by descending price. Ties keep snapshot order and `n` is
/// clamped to the row count.
pub fn top_n(snapshot: &Snapshot, n: usize) -> RankedView<'_> {
    let rows: Vec<&CoinRecord> = snapshot.records.iter().collect();
    let mut rows = sort_for_display(&rows, SortKey::Price, false);
    rows.truncate(n);

    RankedView {
        columns: &snapshot.columns,
        rows,
    }
}

/// Stable sort of borrowed rows into a fresh vector.
pub fn sort_for_display<'a>(rows: &[&'a CoinRecord], by: SortKey, ascending: bool) -> Vec<&'a CoinRecord> {
    let mut sorted = rows.to_vec();
    sorted.sort_by(|a, b| compare_metric(by.value(a), by.value(b), ascending));
    sorted
}

/// Adds one `positive_<column>` flag per requested change column, true iff
/// the value is strictly greater than zero. Repeated columns are collapsed.
pub fn annotate_sign(rows: &[&CoinRecord], columns: &[ChangeColumn]) -> ChangeAnnotatedView {
    let mut seen = HashSet::new();
    let columns: Vec<ChangeColumn> = columns
        .iter()
        .filter(|c| seen.insert(c.timeframe))
        .cloned()
        .collect();

    let rows = rows
        .iter()
        .map(|record| {
            let changes: Vec<f64> = columns
                .iter()
                .map(|c| record.percent_change.get(c.timeframe))
                .collect();
            let positive = changes.iter().map(|v| *v > 0.0).collect();
            AnnotatedRow {
                name: record.name.clone(),
                changes,
                positive,
            }
        })
        .collect();

    ChangeAnnotatedView { columns, rows }
}
