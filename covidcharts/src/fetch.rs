//! Download and validation of the global time series tables

use std::io::Cursor;

use anyhow::Result;
use chrono::NaiveDate;
use log::{debug, info};
use polars::prelude::*;

use crate::{error::CovidChartsError, COL};

/// Country label of the synthetic aggregate row appended to every table.
pub const WORLD: &str = "World";

const DATE_FORMATS: [&str; 2] = ["%m/%d/%y", "%Y-%m-%d"];

/// A wide time series table: one row per (country, province) and one column per date.
#[derive(Debug, Clone)]
pub struct TimeSeriesTable {
    /// Human readable label, e.g. "Deaths as of 09-03-2023"
    pub label: String,
    /// Names of the date columns in `data`, in chronological order
    pub date_columns: Vec<String>,
    /// Parsed `date_columns`, strictly increasing
    pub dates: Vec<NaiveDate>,
    pub as_of: NaiveDate,
    pub data: DataFrame,
}

fn parse_date(column: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(column, format).ok())
}

fn schema_mismatch(name: &str, reason: String) -> CovidChartsError {
    CovidChartsError::SchemaMismatch(name.to_string(), reason)
}

/// Appends a "World" row holding the sum of every row for each date column. Null cells are
/// skipped by the sum, the remaining metadata is left null.
fn append_world(data: &DataFrame, date_columns: &[String]) -> PolarsResult<DataFrame> {
    let world_columns = data
        .get_columns()
        .iter()
        .map(|column| {
            let name = column.name();
            if name == COL::COUNTRY_REGION {
                Series::new(name, &[WORLD]).cast(column.dtype())
            } else if date_columns.iter().any(|date| date == name) {
                let total = column.cast(&DataType::Float64)?.f64()?.sum();
                Series::new(name, &[total]).cast(column.dtype())
            } else {
                Ok(Series::full_null(name, 1, column.dtype()))
            }
        })
        .collect::<PolarsResult<Vec<Series>>>()?;
    let world = DataFrame::new(world_columns)?;
    data.vstack(&world)
}

/// Parse the body of a time series CSV into a `TimeSeriesTable` named `name`.
pub fn parse_time_series(bytes: Vec<u8>, name: &str) -> Result<TimeSeriesTable> {
    let data = CsvReadOptions::default()
        .with_has_header(true)
        .into_reader_with_file_handle(Cursor::new(bytes))
        .finish()?;

    let column_names: Vec<String> = data
        .get_column_names()
        .iter()
        .map(|column| column.to_string())
        .collect();
    for required in COL::TIME_SERIES_METADATA {
        if !column_names.iter().any(|column| column == required) {
            return Err(schema_mismatch(name, format!("missing column '{required}'")).into());
        }
    }

    let date_columns: Vec<String> = column_names
        .into_iter()
        .filter(|column| !COL::TIME_SERIES_METADATA.contains(&column.as_str()))
        .collect();
    let dates = date_columns
        .iter()
        .map(|column| {
            parse_date(column).ok_or_else(|| {
                schema_mismatch(
                    name,
                    format!("column '{column}' is neither metadata nor a date"),
                )
            })
        })
        .collect::<Result<Vec<NaiveDate>, _>>()?;
    let Some(&as_of) = dates.last() else {
        return Err(schema_mismatch(name, "no date columns".into()).into());
    };
    if dates.windows(2).any(|pair| pair[0] >= pair[1]) {
        return Err(schema_mismatch(
            name,
            "date columns are not in chronological order".into(),
        )
        .into());
    }
    debug!("Parsed {} date columns for '{name}'", dates.len());

    let data = append_world(&data, &date_columns)?;
    Ok(TimeSeriesTable {
        label: format!("{name} as of {}", as_of.format("%d-%m-%Y")),
        date_columns,
        dates,
        as_of,
        data,
    })
}

/// Download the time series CSV at `url` and parse it into a `TimeSeriesTable` named `name`.
pub async fn download_data(url: &str, name: &str) -> Result<TimeSeriesTable> {
    info!("Attempting to download '{name}' from {url}");
    let bytes = reqwest::Client::new()
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .bytes()
        .await?
        .to_vec();

    // Required because polars is blocking
    let name = name.to_owned();
    let table = tokio::task::spawn_blocking(move || parse_time_series(bytes, &name)).await??;
    info!(
        "Loaded '{}' with shape: {:?}",
        table.label,
        table.data.shape()
    );
    Ok(table)
}
