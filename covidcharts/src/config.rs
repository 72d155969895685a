use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub confirmed_url: String,
    pub deaths_url: String,
    pub population_url: String,
    /// Countries plotted in every report, named as in the time series tables
    pub countries: Vec<String>,
    /// Population reference names rewritten to the time series naming
    pub population_aliases: BTreeMap<String, String>,
    pub chart_width: u32,
    pub chart_height: u32,
    /// Rolling window applied to the new cases reports
    pub moving_avg_days: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            confirmed_url: "https://raw.githubusercontent.com/CSSEGISandData/COVID-19/master/csse_covid_19_data/csse_covid_19_time_series/time_series_covid19_confirmed_global.csv".into(),
            deaths_url: "https://raw.githubusercontent.com/CSSEGISandData/COVID-19/master/csse_covid_19_data/csse_covid_19_time_series/time_series_covid19_deaths_global.csv".into(),
            population_url: "https://api.worldbank.org/v2/country/all/indicator/SP.POP.TOTL".into(),
            countries: [
                "US",
                "Brazil",
                "Spain",
                "Italy",
                "France",
                "Russia",
                "United Kingdom",
                "India",
                "Germany",
                "Cyprus",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            population_aliases: BTreeMap::from([
                ("United States".to_string(), "US".to_string()),
                ("Russian Federation".to_string(), "Russia".to_string()),
            ]),
            chart_width: 900,
            chart_height: 500,
            moving_avg_days: 7,
        }
    }
}
