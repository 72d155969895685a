use std::path::PathBuf;

use comfy_table::{presets::NOTHING, *};
use covidcharts::{report::Report, COL};
use itertools::izip;
use polars::frame::DataFrame;

use crate::error::CovidChartsCliResult;

fn bordered_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(NOTHING)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_style(comfy_table::TableComponent::BottomBorder, '─')
        .set_style(comfy_table::TableComponent::MiddleHeaderIntersections, '─')
        .set_style(comfy_table::TableComponent::HeaderLines, '─')
        .set_style(comfy_table::TableComponent::BottomBorderIntersections, '─')
        .set_style(comfy_table::TableComponent::TopBorder, '─')
        .set_style(comfy_table::TableComponent::TopBorderIntersections, '─');
    table
}

fn format_count(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.0}")).unwrap_or_else(|| "-".into())
}

/// Table with one row per country of the latest totals returned by `latest_totals`.
pub fn summary_table(totals: &DataFrame) -> CovidChartsCliResult<Table> {
    let mut table = bordered_table();
    table.set_header(vec![
        Cell::new("Country").add_attribute(Attribute::Bold),
        Cell::new("Confirmed").add_attribute(Attribute::Bold),
        Cell::new("Deaths").add_attribute(Attribute::Bold),
        Cell::new("Population").add_attribute(Attribute::Bold),
        Cell::new("Confirmed (% of population)").add_attribute(Attribute::Bold),
    ]);
    for (country, confirmed, deaths, population) in izip!(
        totals.column(COL::COUNTRY)?.str()?,
        totals.column(COL::SUMMARY_CONFIRMED)?.f64()?,
        totals.column(COL::SUMMARY_DEATHS)?.f64()?,
        totals.column(COL::SUMMARY_POPULATION)?.f64()?,
    ) {
        let share = confirmed
            .zip(population)
            .map(|(c, p)| format!("{:.2}", 100.0 * c / p))
            .unwrap_or_else(|| "-".into());
        table.add_row(vec![
            Cell::new(country.unwrap_or_default()),
            Cell::new(format_count(confirmed)).set_alignment(CellAlignment::Right),
            Cell::new(format_count(deaths)).set_alignment(CellAlignment::Right),
            Cell::new(format_count(population)).set_alignment(CellAlignment::Right),
            Cell::new(share).set_alignment(CellAlignment::Right),
        ]);
    }
    Ok(table)
}

pub fn display_summary(label: &str, totals: &DataFrame) -> CovidChartsCliResult<()> {
    let table = summary_table(totals)?;
    println!("\n{label}\n{}", table);
    Ok(())
}

/// Lists the report files that were written.
pub fn display_reports(written: &[(Report, PathBuf)]) {
    let mut table = bordered_table();
    table.set_header(vec![
        Cell::new("Report").add_attribute(Attribute::Bold),
        Cell::new("File").add_attribute(Attribute::Bold),
    ]);
    for (report, path) in written {
        table.add_row(vec![report.title(), path.display().to_string()]);
    }
    println!("\n{}", table);
}
