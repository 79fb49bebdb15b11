use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Percent-change windows published by the listing page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "24h")]
    OneDay,
    #[serde(rename = "7d")]
    SevenDays,
    #[serde(rename = "30d")]
    ThirtyDays,
    #[serde(rename = "60d")]
    SixtyDays,
    #[serde(rename = "90d")]
    NinetyDays,
}

impl Timeframe {
    pub const ALL: [Timeframe; 6] = [
        Timeframe::OneHour,
        Timeframe::OneDay,
        Timeframe::SevenDays,
        Timeframe::ThirtyDays,
        Timeframe::SixtyDays,
        Timeframe::NinetyDays,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Timeframe::OneHour => "1h",
            Timeframe::OneDay => "24h",
            Timeframe::SevenDays => "7d",
            Timeframe::ThirtyDays => "30d",
            Timeframe::SixtyDays => "60d",
            Timeframe::NinetyDays => "90d",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Timeframe::ALL
            .into_iter()
            .find(|t| t.label() == s)
            .ok_or_else(|| format!("unknown timeframe '{}', expected one of 1h, 24h, 7d, 30d, 60d, 90d", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PercentChanges {
    pub h1: f64,
    pub h24: f64,
    pub d7: f64,
    pub d30: f64,
    pub d60: f64,
    pub d90: f64,
}

impl PercentChanges {
    pub fn get(&self, timeframe: Timeframe) -> f64 {
        match timeframe {
            Timeframe::OneHour => self.h1,
            Timeframe::OneDay => self.h24,
            Timeframe::SevenDays => self.d7,
            Timeframe::ThirtyDays => self.d30,
            Timeframe::SixtyDays => self.d60,
            Timeframe::NinetyDays => self.d90,
        }
    }
}

/// One listing row. `cells` holds every canonical column in table order,
/// the typed fields are the ones the ranking and insight code reads.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoinRecord {
    pub name: String,
    pub price: f64,
    pub volume_24h: f64,
    pub percent_change: PercentChanges,
    pub ytd_percent_change: f64,
    #[serde(skip)]
    pub cells: Vec<Value>,
}

/// A normalised listing fetched at a single point in time.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub columns: Vec<String>,
    pub records: Vec<CoinRecord>,
    pub fetched_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Top-N rows of a snapshot, borrowed from it.
#[derive(Debug, Clone)]
pub struct RankedView<'a> {
    pub columns: &'a [String],
    pub rows: Vec<&'a CoinRecord>,
}

impl RankedView<'_> {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A canonical change column together with the window it measures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeColumn {
    pub timeframe: Timeframe,
    pub name: String,
}

impl ChangeColumn {
    pub fn flag_name(&self) -> String {
        format!("positive_{}", self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotatedRow {
    pub name: String,
    pub changes: Vec<f64>,
    pub positive: Vec<bool>,
}

/// Change columns plus one `positive_<column>` flag per column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeAnnotatedView {
    pub columns: Vec<ChangeColumn>,
    pub rows: Vec<AnnotatedRow>,
}

impl ChangeAnnotatedView {
    pub fn column_index(&self, timeframe: Timeframe) -> Option<usize> {
        self.columns.iter().position(|c| c.timeframe == timeframe)
    }

    pub fn flag_columns(&self) -> Vec<String> {
        self.columns.iter().map(ChangeColumn::flag_name).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SteadyGrowth {
    /// No coin satisfied `0 < 1h < 24h < 7d`.
    None,
    Found { coins: Vec<String> },
}

impl SteadyGrowth {
    pub fn coins(&self) -> &[String] {
        match self {
            SteadyGrowth::None => &[],
            SteadyGrowth::Found { coins } => coins,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsightResult {
    pub most_traded: Vec<String>,
    pub highest_ytd: Vec<String>,
    pub steady_growth: SteadyGrowth,
}

impl InsightResult {
    /// Display strings in the order most traded, highest YTD, steady growth.
    pub fn display(&self) -> InsightSummary {
        InsightSummary {
            most_traded: self.most_traded.join(", "),
            highest_ytd: self.highest_ytd.join(", "),
            steady_growth: match &self.steady_growth {
                SteadyGrowth::None => "None".to_string(),
                SteadyGrowth::Found { coins } => coins.join(", "),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsightSummary {
    pub most_traded: String,
    pub highest_ytd: String,
    pub steady_growth: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceBar {
    pub name: String,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeBar {
    pub name: String,
    pub change: f64,
    pub positive: bool,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeSeries {
    pub timeframe: Timeframe,
    pub column: String,
    pub bars: Vec<ChangeBar>,
}
