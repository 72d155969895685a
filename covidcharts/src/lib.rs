use anyhow::Result;
use chart::LineChart;
use fetch::TimeSeriesTable;
use log::{debug, info};
use polars::{df, frame::DataFrame};
use population::Population;
use report::Report;
use reshape::{country_table, SelectOptions};
use strum::IntoEnumIterator;
use tokio::try_join;

use crate::config::Config;

// Re-exports
pub use column_names as COL;

// Modules
pub mod chart;
pub mod column_names;
pub mod config;
pub mod error;
pub mod fetch;
pub mod formatters;
pub mod population;
pub mod report;
pub mod reshape;

/// The downloaded tables and the configuration used to chart them. Immutable once built.
pub struct CovidCharts {
    pub config: Config,
    pub confirmed: TimeSeriesTable,
    pub deaths: TimeSeriesTable,
    pub population: Population,
}

impl CovidCharts {
    /// Download all data with the default configuration
    pub async fn new() -> Result<Self> {
        Self::new_with_config(Config::default()).await
    }

    /// Download all data with custom configuration
    pub async fn new_with_config(config: Config) -> Result<Self> {
        debug!("config: {config:?}");
        let (confirmed, deaths, population) = try_join!(
            fetch::download_data(&config.confirmed_url, "Confirmed cases"),
            fetch::download_data(&config.deaths_url, "Deaths"),
            population::download_population(&config.population_url, &config.population_aliases),
        )?;
        Ok(Self::from_tables(config, confirmed, deaths, population))
    }

    /// Build from tables that are already loaded
    pub fn from_tables(
        config: Config,
        confirmed: TimeSeriesTable,
        deaths: TimeSeriesTable,
        population: Population,
    ) -> Self {
        Self {
            config,
            confirmed,
            deaths,
            population,
        }
    }

    /// Tidy table for the configured countries
    pub fn select_countries(&self, options: &SelectOptions) -> Result<DataFrame> {
        reshape::select_countries(
            &self.confirmed,
            &self.deaths,
            &self.population,
            &self.config.countries,
            options,
        )
    }

    /// Sized and titled chart for a single report
    pub fn chart(&self, report: Report) -> Result<LineChart> {
        let options = report.select_options(self.config.moving_avg_days);
        let df = self.select_countries(&options)?;
        info!("{report}: {} rows", df.height());
        Ok(
            chart::line(df, report.log_scale(), report.relative_to_pop()).properties(
                self.config.chart_width,
                self.config.chart_height,
                &report.title(),
            ),
        )
    }

    /// Charts for every report, in `Report` order
    pub fn charts(&self) -> Result<Vec<(Report, LineChart)>> {
        Report::iter()
            .map(|report| Ok((report, self.chart(report)?)))
            .collect()
    }

    /// Latest cumulative confirmed cases and deaths plus the population of every configured
    /// country found in the tables. Values are not floored.
    pub fn latest_totals(&self) -> Result<DataFrame> {
        let countries = &self.config.countries;
        let confirmed = country_table(&self.confirmed, countries)?;
        let deaths = country_table(&self.deaths, countries)?;
        let latest = |values: Option<&[Option<f64>]>| values.and_then(|v| v.last().copied().flatten());

        let names: Vec<&str> = confirmed.countries();
        let df = df!(
            COL::COUNTRY => &names,
            COL::SUMMARY_CONFIRMED => names.iter().map(|c| latest(confirmed.get(c))).collect::<Vec<_>>(),
            COL::SUMMARY_DEATHS => names.iter().map(|c| latest(deaths.get(c))).collect::<Vec<_>>(),
            COL::SUMMARY_POPULATION => names.iter().map(|c| self.population.get(c)).collect::<Vec<_>>()
        )?;
        Ok(df)
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use serde_json::json;

    use super::*;
    use crate::fetch::parse_time_series;

    const CONFIRMED_CSV: &str = "\
Province/State,Country/Region,Lat,Long,3/1/20,3/2/20,3/3/20,3/4/20,3/5/20
,US,40.0,-100.0,1,2,4,8,16
,Cyprus,35.13,33.43,0,0,1,3,3
";

    const DEATHS_CSV: &str = "\
Province/State,Country/Region,Lat,Long,3/1/20,3/2/20,3/3/20,3/4/20,3/5/20
,US,40.0,-100.0,0,0,1,1,2
,Cyprus,35.13,33.43,0,0,0,0,0
";

    fn covid_charts(countries: &[&str]) -> CovidCharts {
        let config = Config {
            countries: countries.iter().map(|c| c.to_string()).collect(),
            moving_avg_days: 2,
            ..Default::default()
        };
        CovidCharts::from_tables(
            config,
            parse_time_series(CONFIRMED_CSV.as_bytes().to_vec(), "Confirmed cases").unwrap(),
            parse_time_series(DEATHS_CSV.as_bytes().to_vec(), "Deaths").unwrap(),
            [("US", 100.0), ("Cyprus", 10.0)].into_iter().collect(),
        )
    }

    fn population_body() -> serde_json::Value {
        json!([
            {"page": 1, "pages": 1, "per_page": 20000, "total": 2},
            [
                {"country": {"id": "US", "value": "United States"}, "date": "2023", "value": 100.0},
                {"country": {"id": "CY", "value": "Cyprus"}, "date": "2023", "value": 10.0}
            ]
        ])
    }

    fn server_config(server: &MockServer) -> Config {
        Config {
            confirmed_url: server.url("/confirmed.csv"),
            deaths_url: server.url("/deaths.csv"),
            population_url: server.url("/population"),
            countries: vec!["US".into(), "Cyprus".into()],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn covid_charts_should_download_configured_sources() -> anyhow::Result<()> {
        let server = MockServer::start();
        let confirmed = server.mock(|when, then| {
            when.method(GET).path("/confirmed.csv");
            then.status(200).body(CONFIRMED_CSV);
        });
        let deaths = server.mock(|when, then| {
            when.method(GET).path("/deaths.csv");
            then.status(200).body(DEATHS_CSV);
        });
        let population = server.mock(|when, then| {
            when.method(GET).path("/population").query_param("page", "1");
            then.status(200).json_body(population_body());
        });

        let covid = CovidCharts::new_with_config(server_config(&server)).await?;
        confirmed.assert();
        deaths.assert();
        population.assert();
        assert_eq!(covid.population.get("US"), Some(100.0));
        assert_eq!(covid.deaths.label, "Deaths as of 05-03-2020");

        let charts = covid.charts()?;
        assert_eq!(charts.len(), 4);
        Ok(())
    }

    #[tokio::test]
    async fn covid_charts_should_fail_when_any_source_fails() {
        for failing in ["/confirmed.csv", "/deaths.csv", "/population"] {
            let server = MockServer::start();
            for (path, body) in [("/confirmed.csv", CONFIRMED_CSV), ("/deaths.csv", DEATHS_CSV)] {
                if path != failing {
                    server.mock(|when, then| {
                        when.method(GET).path(path);
                        then.status(200).body(body);
                    });
                }
            }
            if failing != "/population" {
                server.mock(|when, then| {
                    when.method(GET).path("/population");
                    then.status(200).json_body(population_body());
                });
            }
            server.mock(|when, then| {
                when.method(GET).path(failing);
                then.status(500);
            });

            let result = CovidCharts::new_with_config(server_config(&server)).await;
            assert!(result.is_err(), "a failing {failing} should abort the download");
        }
    }

    #[test]
    fn charts_should_cover_every_report() -> anyhow::Result<()> {
        let charts = covid_charts(&["US", "Cyprus"]).charts()?;
        let reports: Vec<Report> = charts.iter().map(|(report, _)| *report).collect();
        assert_eq!(reports, Report::iter().collect::<Vec<_>>());
        for (report, chart) in &charts {
            assert_eq!(chart.title(), Some(report.title().as_str()));
            assert!(chart.data().height() > 0);
        }
        Ok(())
    }

    #[test]
    fn new_cases_reports_should_be_smoothed() -> anyhow::Result<()> {
        let covid = covid_charts(&["US"]);
        let chart = covid.chart(Report::NewCasesAbsolute)?;
        // 4 increments per mode, the first of which lacks a full 2 day window
        assert_eq!(chart.data().height(), 2 * 3);
        let totals = covid.chart(Report::TotalCasesAbsolute)?;
        assert_eq!(totals.data().height(), 2 * 5);
        Ok(())
    }

    #[test]
    fn latest_totals_should_not_be_floored() -> anyhow::Result<()> {
        let totals = covid_charts(&["Cyprus", "US", "Atlantis"]).latest_totals()?;
        let expected = df!(
            COL::COUNTRY => &["Cyprus", "US"],
            COL::SUMMARY_CONFIRMED => &[Some(3.0), Some(16.0)],
            COL::SUMMARY_DEATHS => &[Some(0.0), Some(2.0)],
            COL::SUMMARY_POPULATION => &[Some(10.0), Some(100.0)]
        )?;
        assert_eq!(totals, expected);
        Ok(())
    }
}
