use thiserror::Error;

/// A result type for scoregp operations
pub type Result<T> = std::result::Result<T, ScoreGpError>;

/// An error raised while preparing data, training or plotting
#[derive(Error, Debug)]
pub enum ScoreGpError {
    /// When a value or shape is invalid
    #[error("Invalid value: {0}")]
    InvalidValue(String),
    /// When a required dataset column is absent
    #[error("Missing required column: {0}")]
    MissingColumn(String),
    /// When a score target falls outside the expected range
    #[error("Score out of range at row {row}: {value}")]
    ScoreOutOfRange { row: usize, value: i64 },
    /// When the delegated tensor computation fails
    #[error("Tensor computation error: {0}")]
    TensorError(#[from] candle_core::Error),
    /// When CSV ingestion fails
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    /// When chart rendering fails
    #[error("Plot rendering error: {0}")]
    PlotError(String),
    /// When an I/O operation fails
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
