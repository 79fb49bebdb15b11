use crate::services::ranking::{compare_metric, sort_for_display, SortKey};
use crate::types::models::{CoinRecord, InsightResult, Snapshot, SteadyGrowth};

/// Length of every insight list.
pub const INSIGHT_LIMIT: usize = 5;

/// Computes all three insight lists over the full snapshot.
pub fn get_insights(snapshot: &Snapshot) -> InsightResult {
    let rows: Vec<&CoinRecord> = snapshot.records.iter().collect();

    InsightResult {
        most_traded: most_traded(&rows),
        highest_ytd: highest_ytd(&rows),
        steady_growth: steady_growth(&rows),
    }
}

pub fn most_traded(rows: &[&CoinRecord]) -> Vec<String> {
    leaders(rows, SortKey::Volume24h)
}

pub fn highest_ytd(rows: &[&CoinRecord]) -> Vec<String> {
    leaders(rows, SortKey::YtdChange)
}

fn leaders(rows: &[&CoinRecord], by: SortKey) -> Vec<String> {
    sort_for_display(rows, by, false)
        .into_iter()
        .take(INSIGHT_LIMIT)
        .map(|r| r.name.clone())
        .collect()
}

/// `0 < 1h < 24h < 7d`, all strict.
pub fn is_steady(record: &CoinRecord) -> bool {
    let c = &record.percent_change;
    0.0 < c.h1 && c.h1 < c.h24 && c.h24 < c.d7
}

/// Sum of the gaps between consecutive windows: (7d - 24h) + (24h - 1h).
pub fn acceleration_score(record: &CoinRecord) -> f64 {
    let c = &record.percent_change;
    let diff_week = c.d7 - c.h24;
    let diff_day = c.h24 - c.h1;
    diff_week + diff_day
}

pub fn steady_growth(rows: &[&CoinRecord]) -> SteadyGrowth {
    let mut scored: Vec<(&CoinRecord, f64)> = rows
        .iter()
        .copied()
        .filter(|r| is_steady(r))
        .map(|r| (r, acceleration_score(r)))
        .collect();

    if scored.is_empty() {
        return SteadyGrowth::None;
    }

    scored.sort_by(|a, b| compare_metric(a.1, b.1, false));

    SteadyGrowth::Found {
        coins: scored
            .into_iter()
            .take(INSIGHT_LIMIT)
            .map(|(r, _)| r.name.clone())
            .collect(),
    }
}
