use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::Context;
use clap::{command, Args, Parser, Subcommand};
use covidcharts::{
    chart::LineChart,
    config::Config,
    formatters::{CSVFormatter, HtmlFormatter, OutputFormatter, OutputGenerator, VegaLiteFormatter},
    report::Report,
    CovidCharts,
};
use enum_dispatch::enum_dispatch;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use spinners::{Spinner, Spinners};
use strum_macros::EnumString;

use crate::display::{display_reports, display_summary};
use crate::error::CovidChartsCliResult;

const DEFAULT_PROGRESS_SPINNER: Spinners = Spinners::Dots;
const COMPLETE_PROGRESS_STRING: &str = "✔";
const RUNNING_TAIL_STRING: &str = "...";
const DOWNLOADING_STRING: &str = "🦠 Downloading data";
const GENERATING_STRING: &str = "📈 Generating graphs";
const SAVING_STRING: &str = "📥 Saving graphs";

/// Defines the output formats we are able to produce charts in.
#[derive(Clone, Debug, Deserialize, Serialize, EnumString, PartialEq, Eq)]
#[strum(ascii_case_insensitive)]
pub enum OutputFormat {
    Html,
    Json,
    Csv,
}

impl From<&OutputFormat> for OutputFormatter {
    fn from(value: &OutputFormat) -> Self {
        match value {
            OutputFormat::Html => OutputFormatter::Html(HtmlFormatter),
            OutputFormat::Json => OutputFormatter::VegaLite(VegaLiteFormatter),
            OutputFormat::Csv => OutputFormatter::Csv(CSVFormatter),
        }
    }
}

fn start_spinner(quiet: bool, message: &str) -> Option<Spinner> {
    (!quiet).then(|| {
        Spinner::with_timer(
            DEFAULT_PROGRESS_SPINNER,
            message.to_string() + RUNNING_TAIL_STRING,
        )
    })
}

fn stop_spinner(spinner: Option<Spinner>) {
    if let Some(mut s) = spinner {
        s.stop_with_symbol(COMPLETE_PROGRESS_STRING);
    }
}

fn write_output<T, U>(output_generator: &T, chart: &LineChart, output_file: U) -> CovidChartsCliResult<()>
where
    T: OutputGenerator,
    U: AsRef<Path>,
{
    let mut f = File::create(output_file).context("Failed to write output")?;
    output_generator.save(&mut f, chart)?;
    Ok(())
}

/// Launch `browser` on `path` without waiting for it to exit.
fn open_in_browser(browser: &str, path: &Path) -> CovidChartsCliResult<()> {
    debug!("Opening {} in {browser}", path.display());
    #[cfg(target_os = "macos")]
    let mut command = {
        let mut command = Command::new("open");
        command.arg("-a").arg(browser);
        command
    };
    #[cfg(not(target_os = "macos"))]
    let mut command = Command::new(browser);
    command.arg(path).spawn()?;
    Ok(())
}

/// Trait that defines what to run when a given subcommand is invoked.
#[enum_dispatch]
pub trait RunCommand {
    async fn run(&self, config: Config) -> CovidChartsCliResult<()>;
}

/// Generates every report chart and writes one file per report. This is what runs when no
/// subcommand is given.
#[derive(Args, Debug)]
pub struct ReportsCommand {
    #[arg(
        short = 'b',
        long,
        help = "Browser application to open the generated charts in"
    )]
    browser: Option<String>,
    #[arg(
        short = 'o',
        long,
        default_value = ".",
        help = "Directory to write the charts to"
    )]
    output_dir: PathBuf,
    #[arg(
        short = 'f',
        long,
        value_name = "html|json|csv",
        default_value = "html",
        help = "Output format for the charts"
    )]
    format: OutputFormat,
    #[arg(
        short = 'q',
        long = "quiet",
        help = "\
            Do not print progress bar to stdout. Results and logs (when `RUST_LOG`\n\
            is set) will still be printed.",
        global = true
    )]
    quiet: bool,
}

impl ReportsCommand {
    /// Writes every chart to `output_dir`, returning the written paths in report order.
    fn save_charts(&self, charts: &[(Report, LineChart)]) -> CovidChartsCliResult<Vec<(Report, PathBuf)>> {
        let formatter: OutputFormatter = (&self.format).into();
        std::fs::create_dir_all(&self.output_dir)?;
        charts
            .iter()
            .map(|(report, chart)| {
                let path = self
                    .output_dir
                    .join(format!("{}.{}", report.file_stem(), formatter.extension()));
                info!("Writing {report} to {}", path.display());
                write_output(&formatter, chart, &path)?;
                Ok((*report, path))
            })
            .collect()
    }
}

impl RunCommand for ReportsCommand {
    async fn run(&self, config: Config) -> CovidChartsCliResult<()> {
        info!("Running reports");
        let sp = start_spinner(self.quiet, DOWNLOADING_STRING);
        let covid_charts = CovidCharts::new_with_config(config).await?;
        stop_spinner(sp);

        let sp = start_spinner(self.quiet, GENERATING_STRING);
        let charts = covid_charts.charts()?;
        stop_spinner(sp);

        let sp = start_spinner(self.quiet, SAVING_STRING);
        let written = self.save_charts(&charts)?;
        stop_spinner(sp);
        display_reports(&written);

        if let Some(browser) = &self.browser {
            for (_, path) in &written {
                open_in_browser(browser, path)?;
            }
        }
        Ok(())
    }
}

/// The summary command prints the latest cumulative figures for the configured countries.
#[derive(Args, Debug)]
pub struct SummaryCommand {
    #[arg(from_global)]
    quiet: bool,
}

impl RunCommand for SummaryCommand {
    async fn run(&self, config: Config) -> CovidChartsCliResult<()> {
        info!("Running `summary` subcommand");
        let sp = start_spinner(self.quiet, DOWNLOADING_STRING);
        let covid_charts = CovidCharts::new_with_config(config).await?;
        stop_spinner(sp);
        let totals = covid_charts.latest_totals()?;
        display_summary(&covid_charts.confirmed.label, &totals)?;
        Ok(())
    }
}

/// The entrypoint for the CLI.
#[derive(Parser, Debug)]
#[command(
    version,
    about = "Make covid charts.",
    long_about = None,
    name = "covidcharts",
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
    #[command(flatten)]
    pub reports: ReportsCommand,
}

/// Commands contains the list of subcommands avaliable for use in the CLI.
/// Each command should implmement the RunCommand trait and specify the list
/// of required args for that command.
#[derive(Subcommand, Debug)]
#[enum_dispatch(RunCommand)]
pub enum Commands {
    /// Print the latest cumulative confirmed cases and deaths per country
    Summary(SummaryCommand),
}
