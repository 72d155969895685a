//! Reshaping of the wide time series tables into per-country tables and the tidy table that
//! the charts consume.

use anyhow::Result;
use chrono::NaiveDate;
use itertools::Itertools;
use log::{debug, warn};
use polars::prelude::*;
use strum_macros::{AsRefStr, Display};

use crate::{error::CovidChartsError, fetch::TimeSeriesTable, population::Population, COL};

/// The metric a tidy table row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
pub enum Mode {
    Confirmed,
    Deaths,
}

/// The series of a single country, aligned with the dates of its `CountryTable`.
#[derive(Debug, Clone, PartialEq)]
pub struct CountrySeries {
    pub country: String,
    pub values: Vec<Option<f64>>,
}

/// A date indexed table with one column per country.
#[derive(Debug, Clone, PartialEq)]
pub struct CountryTable {
    pub dates: Vec<NaiveDate>,
    pub columns: Vec<CountrySeries>,
}

impl CountryTable {
    pub fn countries(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.country.as_str()).collect()
    }

    pub fn get(&self, country: &str) -> Option<&[Option<f64>]> {
        self.columns
            .iter()
            .find(|c| c.country == country)
            .map(|c| c.values.as_slice())
    }

    fn map_values<F: Fn(&[Option<f64>]) -> Vec<Option<f64>>>(mut self, f: F) -> Self {
        for column in self.columns.iter_mut() {
            column.values = f(&column.values);
        }
        self
    }
}

/// Options for `select_countries`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectOptions {
    /// Daily increments instead of cumulative totals
    pub new_cases: bool,
    /// Divide by the country population
    pub relative_to_pop: bool,
    /// Trailing moving average window in days, 1 leaves the data untouched
    pub moving_avg_days: usize,
}

impl Default for SelectOptions {
    fn default() -> Self {
        Self {
            new_cases: false,
            relative_to_pop: false,
            moving_avg_days: 1,
        }
    }
}

/// `next - current` for every date; the last date has no successor and is missing.
pub fn forward_difference(values: &[Option<f64>]) -> Vec<Option<f64>> {
    if values.is_empty() {
        return vec![];
    }
    values
        .windows(2)
        .map(|pair| match pair {
            [Some(current), Some(next)] => Some(next - current),
            _ => None,
        })
        .chain(std::iter::once(None))
        .collect()
}

/// Raise every present value below 1 to 1 so that log scales stay defined.
pub fn floor_at_one(values: &[Option<f64>]) -> Vec<Option<f64>> {
    values.iter().map(|v| v.map(|v| v.max(1.0))).collect()
}

/// Trailing mean over `window` consecutive values. A position is missing until a full window is
/// available, or when any value inside its window is missing.
pub fn moving_average(values: &[Option<f64>], window: usize) -> Result<Vec<Option<f64>>> {
    if window == 0 {
        return Err(CovidChartsError::InvalidWindow(window).into());
    }
    Ok((0..values.len())
        .map(|idx| {
            if idx + 1 < window {
                return None;
            }
            values[idx + 1 - window..=idx]
                .iter()
                .copied()
                .sum::<Option<f64>>()
                .map(|total| total / window as f64)
        })
        .collect())
}

/// Rows of `table` for the requested countries, excluding sub-national (province) rows.
fn filter_countries(table: &TimeSeriesTable, countries: &[String]) -> PolarsResult<DataFrame> {
    let names = Series::new("countries", countries);
    table
        .data
        .clone()
        .lazy()
        .filter(
            col(COL::COUNTRY_REGION)
                .is_in(lit(names))
                .and(col(COL::PROVINCE_STATE).is_null()),
        )
        .collect()
}

/// Filter `table` to the national rows of `countries` and transpose it so that dates index the
/// rows. Columns follow the order of `countries`; countries absent from the table are skipped.
pub fn country_table(table: &TimeSeriesTable, countries: &[String]) -> Result<CountryTable> {
    let filtered = filter_countries(table, countries)?;
    debug!(
        "Selected {} national rows from '{}'",
        filtered.height(),
        table.label
    );
    let names = filtered.column(COL::COUNTRY_REGION)?.str()?;
    let date_series = table
        .date_columns
        .iter()
        .map(|column| filtered.column(column)?.cast(&DataType::Float64))
        .collect::<PolarsResult<Vec<Series>>>()?;

    let mut columns = vec![];
    for country in countries.iter().unique() {
        let rows = names
            .into_iter()
            .positions(|name| name == Some(country.as_str()))
            .collect_vec();
        let Some(&row) = rows.first() else {
            warn!("'{country}' has no national row in '{}'", table.label);
            continue;
        };
        if rows.len() > 1 {
            warn!(
                "'{country}' has {} national rows in '{}', keeping the first",
                rows.len(),
                table.label
            );
        }
        let values = date_series
            .iter()
            .map(|series| Ok(series.f64()?.get(row)))
            .collect::<PolarsResult<Vec<Option<f64>>>>()?;
        columns.push(CountrySeries {
            country: country.clone(),
            values,
        });
    }
    Ok(CountryTable {
        dates: table.dates.clone(),
        columns,
    })
}

/// Reshape one metric: select and transpose `countries`, then optionally take daily increments,
/// floor at one and optionally divide by `population`.
///
/// Countries missing from `population` get an all-missing series when `relative_to_pop` is set.
pub fn reshape(
    table: &TimeSeriesTable,
    countries: &[String],
    new_cases: bool,
    relative_to_pop: bool,
    population: &Population,
) -> Result<CountryTable> {
    let mut reshaped = country_table(table, countries)?;
    if new_cases {
        reshaped = reshaped.map_values(forward_difference);
    }
    reshaped = reshaped.map_values(floor_at_one);
    if relative_to_pop {
        for column in reshaped.columns.iter_mut() {
            match population.get(&column.country) {
                Some(total) => {
                    column.values = column.values.iter().map(|v| v.map(|v| v / total)).collect();
                }
                None => {
                    warn!(
                        "No population figure for '{}', its relative values will be missing",
                        column.country
                    );
                    column.values = vec![None; column.values.len()];
                }
            }
        }
    }
    Ok(reshaped)
}

/// Build the tidy table (`Dates`, `Mode`, `Country`, `cases`) for `countries` from both metrics.
///
/// Rows are ordered by mode, then country, then date. Rows whose value is missing after the
/// moving average are dropped.
pub fn select_countries(
    confirmed: &TimeSeriesTable,
    deaths: &TimeSeriesTable,
    population: &Population,
    countries: &[String],
    options: &SelectOptions,
) -> Result<DataFrame> {
    let reshaped = [
        (Mode::Confirmed, confirmed),
        (Mode::Deaths, deaths),
    ]
    .into_iter()
    .map(|(mode, table)| {
        reshape(
            table,
            countries,
            options.new_cases,
            options.relative_to_pop,
            population,
        )
        .map(|reshaped| (mode, reshaped))
    })
    .collect::<Result<Vec<_>>>()?;

    let mut dates: Vec<String> = vec![];
    let mut modes: Vec<&str> = vec![];
    let mut names: Vec<&str> = vec![];
    let mut cases: Vec<f64> = vec![];
    for (mode, table) in &reshaped {
        for column in &table.columns {
            let averaged = moving_average(&column.values, options.moving_avg_days)?;
            for (date, value) in table.dates.iter().zip(averaged) {
                let Some(value) = value else {
                    continue;
                };
                dates.push(date.format("%Y-%m-%d").to_string());
                modes.push(mode.as_ref());
                names.push(&column.country);
                cases.push(value);
            }
        }
    }

    let tidy = df!(
        COL::DATES => dates,
        COL::MODE => modes,
        COL::COUNTRY => names,
        COL::CASES => cases
    )?;
    debug!("Tidy table shape for {options:?}: {:?}", tidy.shape());
    Ok(tidy)
}
