use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::types::errors::AcquisitionError;

/// One listing row keyed by source column name.
pub type RawRow = HashMap<String, Value>;
pub type RawTable = Vec<RawRow>;

/// Supplier of raw listing tables.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch(&self) -> Result<RawTable, AcquisitionError>;
}

/// Scrapes the listing embedded in the CoinMarketCap home page.
pub struct CoinMarketCapSource {
    client: Client,
    url: String,
}

impl CoinMarketCapSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, AcquisitionError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("crypto-monitor/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl SnapshotSource for CoinMarketCapSource {
    async fn fetch(&self) -> Result<RawTable, AcquisitionError> {
        let started = std::time::Instant::now();

        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AcquisitionError::Status(status.as_u16()));
        }
        let html = response.text().await?;

        let table = parse_listing_page(&html)?;
        tracing::info!(
            "Fetched {} listings from {} in {:?}",
            table.len(),
            self.url,
            started.elapsed()
        );

        Ok(table)
    }
}

/// Extracts the listing table from the page's `__NEXT_DATA__` script.
pub fn parse_listing_page(html: &str) -> Result<RawTable, AcquisitionError> {
    let payload = next_data_script(html).ok_or(AcquisitionError::MissingPayload("__NEXT_DATA__ script"))?;
    let next_data: Value = serde_json::from_str(payload)?;

    // initialState is itself a JSON document, usually shipped as a string
    let initial_state: Value = match &next_data["props"]["initialState"] {
        Value::String(s) => serde_json::from_str(s)?,
        Value::Null => return Err(AcquisitionError::MissingPayload("props.initialState")),
        other => other.clone(),
    };

    let listings = initial_state["cryptocurrency"]["listingLatest"]["data"]
        .as_array()
        .ok_or(AcquisitionError::MissingPayload("cryptocurrency.listingLatest.data"))?;

    parse_listing_rows(listings)
}

/// Element 0 holds `keysArr`; every later element is a positional value array.
pub fn parse_listing_rows(listings: &[Value]) -> Result<RawTable, AcquisitionError> {
    let Some((header, rows)) = listings.split_first() else {
        return Ok(Vec::new());
    };

    let keys: Vec<&str> = header["keysArr"]
        .as_array()
        .ok_or(AcquisitionError::MissingPayload("keysArr"))?
        .iter()
        .filter_map(Value::as_str)
        .collect();

    rows.iter()
        .map(|row| -> Result<RawRow, AcquisitionError> {
            let values = row
                .as_array()
                .ok_or(AcquisitionError::MissingPayload("listing row array"))?;
            // trailing values beyond keysArr carry no column name
            Ok(keys
                .iter()
                .zip(values)
                .map(|(key, value)| (key.to_string(), value.clone()))
                .collect())
        })
        .collect()
}

fn next_data_script(html: &str) -> Option<&str> {
    let marker = html.find(r#"id="__NEXT_DATA__""#)?;
    let open_end = marker + html[marker..].find('>')? + 1;
    let close = open_end + html[open_end..].find("</script>")?;
    Some(html[open_end..close].trim())
}
