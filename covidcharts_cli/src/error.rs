use polars::error::PolarsError;

#[derive(thiserror::Error, Debug)]
pub enum CovidChartsCliError {
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
    #[error("polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("invalid TOML in config file: {0}")]
    TomlError(#[from] toml::de::Error),
    #[error("std IO error: {0}")]
    IOError(#[from] std::io::Error),
}

pub type CovidChartsCliResult<T> = Result<T, CovidChartsCliError>;
