use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("row {row} is missing configured column '{column}'")]
    MissingColumn { row: usize, column: String },
    #[error("duplicate coin '{name}' in snapshot")]
    DuplicateIdentity { name: String },
    #[error("row {row} has invalid value {value} in column '{column}'")]
    InvalidValue { row: usize, column: String, value: String },
}

#[derive(Error, Debug)]
pub enum AcquisitionError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("listing page returned status {0}")]
    Status(u16),
    #[error("listing payload missing {0}")]
    MissingPayload(&'static str),
    #[error("malformed listing JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure of a snapshot refresh. The previously cached snapshot stays valid.
#[derive(Error, Debug)]
pub enum RefreshError {
    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    /// Another request's refresh failed while this one was waiting on it.
    #[error("concurrent refresh failed: {0}")]
    Concurrent(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}
