use thiserror::Error;

pub type Result<T> = std::result::Result<T, DashboardError>;

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Date parsing error: {0}")]
    DateParse(#[from] chrono::ParseError),

    #[error("Parquet write error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Zip archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration source error: {0}")]
    ConfigSource(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Chart rendering error: {0}")]
    Chart(String),

    #[error("Station '{station}' not found (known stations: {known})")]
    StationNotFound { station: String, known: String },

    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Invalid data format at row {row}: {message}")]
    InvalidRow { row: u64, message: String },

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("No readings found in {0}")]
    EmptyDataset(String),

    #[error("Async task error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

impl DashboardError {
    pub fn chart<E: std::fmt::Display>(err: E) -> Self {
        DashboardError::Chart(err.to_string())
    }
}
