//! This module stores the column names used by the time series tables and the tidy table. The
//! metadata names must be kept in sync with the header of the upstream CSSE time series files.

pub const PROVINCE_STATE: &str = "Province/State";
pub const COUNTRY_REGION: &str = "Country/Region";
pub const LAT: &str = "Lat";
pub const LONG: &str = "Long";

/// Metadata columns of a raw time series table, in upstream order.
pub const TIME_SERIES_METADATA: [&str; 4] = [PROVINCE_STATE, COUNTRY_REGION, LAT, LONG];

pub const DATES: &str = "Dates";
pub const MODE: &str = "Mode";
pub const COUNTRY: &str = "Country";
pub const CASES: &str = "cases";

pub const SUMMARY_CONFIRMED: &str = "Confirmed";
pub const SUMMARY_DEATHS: &str = "Deaths";
pub const SUMMARY_POPULATION: &str = "Population";
