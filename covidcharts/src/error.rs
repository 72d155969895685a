//! Error types.

#[derive(thiserror::Error, Debug)]
pub enum CovidChartsError {
    #[error("Wrapped anyhow error: {0}")]
    AnyhowError(#[from] anyhow::Error),
    #[error("Unexpected time series schema in '{0}': {1}")]
    SchemaMismatch(String, String),
    #[error("Moving average window must be at least one day, got {0}")]
    InvalidWindow(usize),
    #[error("Unexpected population response: {0}")]
    PopulationResponse(String),
    #[error("Wrapped polars error: {0}")]
    PolarsError(#[from] polars::error::PolarsError),
}
