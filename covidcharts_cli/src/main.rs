mod cli;
mod display;
mod error;

use clap::Parser;
use cli::{Cli, RunCommand};
use covidcharts::config::Config;
use error::{CovidChartsCliError, CovidChartsCliResult};
use log::debug;

const DEFAULT_LOGGING_LEVEL: &str = "warn";

#[tokio::main]
async fn main() -> CovidChartsCliResult<()> {
    // Set RUST_LOG to `DEFAULT_LOGGING_LEVEL` if not set
    let _ =
        std::env::var("RUST_LOG").map_err(|_| std::env::set_var("RUST_LOG", DEFAULT_LOGGING_LEVEL));
    pretty_env_logger::init_timed();
    let args = Cli::parse();
    debug!("args: {args:?}");
    let config: Config = read_config_from_toml()?;
    debug!("config: {config:?}");

    let result = match &args.command {
        Some(command) => command.run(config).await,
        None => args.reports.run(config).await,
    };
    // Return ok if pipe is closed instead of error, otherwise return error
    // See: https://stackoverflow.com/a/65760807, https://github.com/rust-lang/rust/issues/62569
    if let Err(err) = result {
        if let CovidChartsCliError::IOError(err) = &err {
            if err.kind() == std::io::ErrorKind::BrokenPipe {
                return Ok(());
            }
        }
        Err(err)?;
    }
    Ok(())
}

fn read_config_from_toml() -> CovidChartsCliResult<Config> {
    // macOS: ~/Library/Application Support/covidcharts/config.toml
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(Config::default());
    };
    let file_path = config_dir.join("covidcharts").join("config.toml");
    match std::fs::read_to_string(&file_path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Config::default()),
        Err(e) => Err(e.into()),
    }
}
