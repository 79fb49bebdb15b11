use crate::services::ranking::{compare_metric, sort_for_display, SortKey};
use crate::types::models::{ChangeAnnotatedView, ChangeBar, ChangeSeries, PriceBar, RankedView, Timeframe};

pub const POSITIVE_COLOR: &str = "green";
pub const NEGATIVE_COLOR: &str = "red";

pub fn sign_color(positive: bool) -> &'static str {
    if positive {
        POSITIVE_COLOR
    } else {
        NEGATIVE_COLOR
    }
}

/// Horizontal price bars, cheapest first.
pub fn price_series(view: &RankedView<'_>) -> Vec<PriceBar> {
    sort_for_display(&view.rows, SortKey::Price, true)
        .into_iter()
        .map(|r| PriceBar {
            name: r.name.clone(),
            price: r.price,
        })
        .collect()
}

/// Change bars for one timeframe, ascending by change. `None` when the view
/// was not annotated for that timeframe.
pub fn change_series(view: &ChangeAnnotatedView, timeframe: Timeframe) -> Option<ChangeSeries> {
    let index = view.column_index(timeframe)?;

    let mut bars: Vec<ChangeBar> = view
        .rows
        .iter()
        .map(|row| ChangeBar {
            name: row.name.clone(),
            change: row.changes[index],
            positive: row.positive[index],
            color: sign_color(row.positive[index]),
        })
        .collect();
    bars.sort_by(|a, b| compare_metric(a.change, b.change, true));

    Some(ChangeSeries {
        timeframe,
        column: view.columns[index].name.clone(),
        bars,
    })
}
