//! Process settings and the listing column contract.
//!
//! Process settings come from environment variables (a `.env` file is
//! honoured). The column contract is a JSON file read once at startup and
//! validated into a [`ColumnMapping`] before anything touches listing data.

use std::collections::{BTreeMap, HashSet};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::types::errors::ConfigError;
use crate::types::models::{ChangeColumn, Timeframe};

pub const DEFAULT_LISTING_URL: &str = "https://coinmarketcap.com";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_bind: String,
    pub frontend_bind: String,
    pub api_base_url: String,
    pub listing_url: String,
    pub column_config: PathBuf,
    pub snapshot_ttl: Duration,
    pub insights_enabled: bool,
    pub refresh_per_minute: u32,
    pub http_timeout: Duration,
}

fn env_str(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_u32(name: &str, default: u32) -> u32 {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .map(|s| matches!(s.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            api_bind: env_str("API_BIND", "0.0.0.0:8000"),
            frontend_bind: env_str("FRONTEND_BIND", "0.0.0.0:3000"),
            api_base_url: env_str("API_BASE_URL", "http://localhost:8000"),
            listing_url: env_str("LISTING_URL", DEFAULT_LISTING_URL),
            column_config: PathBuf::from(env_str("COLUMN_CONFIG", "config/columns.json")),
            snapshot_ttl: Duration::from_secs(env_u64("SNAPSHOT_TTL_SECS", 600)),
            insights_enabled: env_bool("INSIGHTS_ENABLED", true),
            refresh_per_minute: env_u32("REFRESH_PER_MINUTE", 6),
            http_timeout: Duration::from_secs(env_u64("HTTP_TIMEOUT_SECS", 30)),
        }
    }
}

/// Column contract as it appears on disk.
#[derive(Debug, Deserialize)]
pub struct ColumnConfigFile {
    pub select_columns: Vec<String>,
    pub new_col_names: Vec<String>,
    pub period_column_mapping: BTreeMap<String, String>,
    #[serde(default)]
    pub field_columns: FieldColumns,
}

/// Canonical columns the engine reads typed values from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FieldColumns {
    pub identity: String,
    pub price: String,
    pub volume_24h: String,
    pub ytd_percent_change: String,
}

impl Default for FieldColumns {
    fn default() -> Self {
        Self {
            identity: "Cryptocurrency".to_string(),
            price: "Price".to_string(),
            volume_24h: "Volume24h".to_string(),
            ytd_percent_change: "YTDPricePercentChange".to_string(),
        }
    }
}

/// Validated column contract.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMapping {
    selections: Vec<(String, String)>,
    periods: BTreeMap<Timeframe, String>,
    fields: FieldColumns,
}

impl ColumnMapping {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let file: ColumnConfigFile = serde_json::from_str(raw)?;
        Self::try_from(file)
    }

    /// `(source column, canonical column)` pairs in table order.
    pub fn selections(&self) -> &[(String, String)] {
        &self.selections
    }

    pub fn canonical_columns(&self) -> Vec<String> {
        self.selections.iter().map(|(_, canonical)| canonical.clone()).collect()
    }

    pub fn fields(&self) -> &FieldColumns {
        &self.fields
    }

    pub fn change_column(&self, timeframe: Timeframe) -> ChangeColumn {
        ChangeColumn {
            timeframe,
            // every timeframe is present after validation
            name: self.periods.get(&timeframe).cloned().unwrap_or_default(),
        }
    }

    pub fn change_columns(&self) -> Vec<ChangeColumn> {
        Timeframe::ALL.into_iter().map(|t| self.change_column(t)).collect()
    }

    /// Position of a canonical column in the normalised table.
    pub fn position(&self, canonical: &str) -> Option<usize> {
        self.selections.iter().position(|(_, c)| c == canonical)
    }
}

impl TryFrom<ColumnConfigFile> for ColumnMapping {
    type Error = ConfigError;

    fn try_from(file: ColumnConfigFile) -> Result<Self, Self::Error> {
        let ColumnConfigFile {
            select_columns,
            new_col_names,
            period_column_mapping,
            field_columns,
        } = file;

        if select_columns.is_empty() {
            return Err(ConfigError::Invalid("select_columns is empty".into()));
        }
        if select_columns.len() != new_col_names.len() {
            return Err(ConfigError::Invalid(format!(
                "select_columns has {} entries but new_col_names has {}",
                select_columns.len(),
                new_col_names.len()
            )));
        }
        ensure_unique("select_columns", &select_columns)?;
        ensure_unique("new_col_names", &new_col_names)?;

        let canonical: HashSet<&str> = new_col_names.iter().map(String::as_str).collect();
        let require = |what: &str, column: &str| {
            if canonical.contains(column) {
                Ok(())
            } else {
                Err(ConfigError::Invalid(format!(
                    "{} column '{}' is not listed in new_col_names",
                    what, column
                )))
            }
        };

        let mut periods = BTreeMap::new();
        for (label, column) in &period_column_mapping {
            let timeframe: Timeframe = label.parse().map_err(ConfigError::Invalid)?;
            require(&format!("period {}", label), column)?;
            periods.insert(timeframe, column.clone());
        }
        for timeframe in Timeframe::ALL {
            if !periods.contains_key(&timeframe) {
                return Err(ConfigError::Invalid(format!(
                    "period_column_mapping is missing timeframe {}",
                    timeframe
                )));
            }
        }

        require("identity", &field_columns.identity)?;
        require("price", &field_columns.price)?;
        require("volume", &field_columns.volume_24h)?;
        require("YTD", &field_columns.ytd_percent_change)?;

        Ok(Self {
            selections: select_columns.into_iter().zip(new_col_names).collect(),
            periods,
            fields: field_columns,
        })
    }
}

fn ensure_unique(what: &str, columns: &[String]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for column in columns {
        if !seen.insert(column.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "{} lists '{}' more than once",
                what, column
            )));
        }
    }
    Ok(())
}
