use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde_json::Value;

use crate::config::ColumnMapping;
use crate::services::listing::{RawRow, RawTable};
use crate::types::errors::SchemaError;
use crate::types::models::{CoinRecord, PercentChanges, Snapshot, Timeframe};

/// Selects and renames the configured columns, keeping source row order.
pub fn normalize(
    raw: &RawTable,
    mapping: &ColumnMapping,
    fetched_at: DateTime<Utc>,
) -> Result<Snapshot, SchemaError> {
    let records = raw
        .par_iter()
        .enumerate()
        .map(|(index, row)| to_record(index, row, mapping))
        .collect::<Result<Vec<_>, _>>()?;

    let mut seen = HashSet::with_capacity(records.len());
    for record in &records {
        if !seen.insert(record.name.as_str()) {
            return Err(SchemaError::DuplicateIdentity {
                name: record.name.clone(),
            });
        }
    }

    Ok(Snapshot {
        columns: mapping.canonical_columns(),
        records,
        fetched_at,
    })
}

fn to_record(index: usize, row: &RawRow, mapping: &ColumnMapping) -> Result<CoinRecord, SchemaError> {
    let cells = mapping
        .selections()
        .iter()
        .map(|(source, _)| {
            row.get(source).cloned().ok_or_else(|| SchemaError::MissingColumn {
                row: index,
                column: source.clone(),
            })
        })
        .collect::<Result<Vec<Value>, _>>()?;

    let fields = mapping.fields();
    let number = |canonical: &str| parse_number(index, canonical, cell(&cells, mapping, canonical));
    let change = |timeframe: Timeframe| number(&mapping.change_column(timeframe).name);

    let name = match cell(&cells, mapping, &fields.identity) {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        other => return Err(invalid(index, &fields.identity, other)),
    };
    let price = number(&fields.price)?;
    let volume_24h = number(&fields.volume_24h)?;
    let ytd_percent_change = number(&fields.ytd_percent_change)?;
    let percent_change = PercentChanges {
        h1: change(Timeframe::OneHour)?,
        h24: change(Timeframe::OneDay)?,
        d7: change(Timeframe::SevenDays)?,
        d30: change(Timeframe::ThirtyDays)?,
        d60: change(Timeframe::SixtyDays)?,
        d90: change(Timeframe::NinetyDays)?,
    };

    Ok(CoinRecord {
        name,
        price,
        volume_24h,
        percent_change,
        ytd_percent_change,
        cells,
    })
}

static NULL: Value = Value::Null;

fn cell<'a>(cells: &'a [Value], mapping: &ColumnMapping, canonical: &str) -> &'a Value {
    // field columns are part of the selection once the mapping is validated
    mapping
        .position(canonical)
        .and_then(|i| cells.get(i))
        .unwrap_or(&NULL)
}

/// JSON numbers and numeric strings parse; `null` becomes NaN.
fn parse_number(row: usize, column: &str, value: &Value) -> Result<f64, SchemaError> {
    match value {
        Value::Number(n) => n.as_f64().ok_or_else(|| invalid(row, column, value)),
        Value::String(s) => s.trim().parse::<f64>().map_err(|_| invalid(row, column, value)),
        Value::Null => Ok(f64::NAN),
        _ => Err(invalid(row, column, value)),
    }
}

fn invalid(row: usize, column: &str, value: &Value) -> SchemaError {
    SchemaError::InvalidValue {
        row,
        column: column.to_string(),
        value: value.to_string(),
    }
}
