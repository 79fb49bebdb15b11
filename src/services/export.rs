use csv::Writer;
use serde_json::Value;

use crate::types::models::RankedView;

/// File name offered for the table download.
pub const EXPORT_FILE_NAME: &str = "crypto_price.csv";

/// Encodes the displayed table as UTF-8 CSV: canonical header, no index
/// column, rows in view order.
pub fn to_csv(view: &RankedView<'_>) -> Result<Vec<u8>, csv::Error> {
    let mut writer = Writer::from_writer(Vec::new());
    writer.write_record(view.columns)?;

    for row in &view.rows {
        writer.write_record(row.cells.iter().map(cell_text))?;
    }

    writer.into_inner().map_err(|e| e.into_error().into())
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}
