use anyhow::Result;
use enum_dispatch::enum_dispatch;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::io::Write;

use crate::chart::LineChart;

const VEGA_SCRIPTS: [&str; 3] = [
    "https://cdn.jsdelivr.net/npm/vega@5",
    "https://cdn.jsdelivr.net/npm/vega-lite@4.17.0",
    "https://cdn.jsdelivr.net/npm/vega-embed@6",
];

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Trait to define different output generators. Defines two
/// functions, format which generates a serialized string of the
/// chart and save which writes it to a writer
#[enum_dispatch]
pub trait OutputGenerator {
    /// File extension, without the leading dot
    fn extension(&self) -> &'static str;
    fn save(&self, writer: &mut impl Write, chart: &LineChart) -> Result<()>;
    fn format(&self, chart: &LineChart) -> Result<String> {
        // Just creating an empty vec to store the buffered output
        let mut data: Vec<u8> = vec![];
        let mut buff = Cursor::new(&mut data);
        self.save(&mut buff, chart)?;

        Ok(String::from_utf8(data)?)
    }
}

/// Enum of OutputFormatters one for each potential
/// output type
#[enum_dispatch(OutputGenerator)]
#[derive(Serialize, Deserialize, Debug)]
pub enum OutputFormatter {
    Html(HtmlFormatter),
    VegaLite(VegaLiteFormatter),
    Csv(CSVFormatter),
}

/// A standalone HTML page that renders the chart with vega-embed
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct HtmlFormatter;

impl OutputGenerator for HtmlFormatter {
    fn extension(&self) -> &'static str {
        "html"
    }

    fn save(&self, writer: &mut impl Write, chart: &LineChart) -> Result<()> {
        // Escape "<" so the embedded spec can never close the script element
        let spec = serde_json::to_string(&chart.to_spec()?)?.replace('<', "\\u003c");
        let title = escape_html(chart.title().unwrap_or("covidcharts"));
        let scripts = VEGA_SCRIPTS
            .iter()
            .map(|src| format!(r#"  <script type="text/javascript" src="{src}"></script>"#))
            .collect::<Vec<_>>()
            .join("\n");
        write!(
            writer,
            r##"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>{title}</title>
  <style>
    .error {{
        color: red;
    }}
  </style>
{scripts}
</head>
<body>
  <div id="vis"></div>
  <script>
    (function(vegaEmbed) {{
      var spec = {spec};
      var embedOpt = {{"mode": "vega-lite"}};

      function showError(el, error){{
          el.innerHTML = ('<div class="error" style="color:red;">'
                          + '<p>JavaScript Error: ' + error.message + '</p>'
                          + "<p>This usually means there's a typo in your chart specification. "
                          + "See the javascript console for the full traceback.</p>"
                          + '</div>');
          throw error;
      }}
      const el = document.getElementById('vis');
      vegaEmbed("#vis", spec, embedOpt)
        .catch(error => showError(el, error));
    }})(vegaEmbed);
  </script>
</body>
</html>
"##
        )?;
        Ok(())
    }
}

/// The bare Vega-Lite specification as pretty printed JSON
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct VegaLiteFormatter;

impl OutputGenerator for VegaLiteFormatter {
    fn extension(&self) -> &'static str {
        "vl.json"
    }

    fn save(&self, writer: &mut impl Write, chart: &LineChart) -> Result<()> {
        serde_json::to_writer_pretty(&mut *writer, &chart.to_spec()?)?;
        writeln!(writer)?;
        Ok(())
    }
}

/// The tidy table behind the chart as CSV
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct CSVFormatter;

impl OutputGenerator for CSVFormatter {
    fn extension(&self) -> &'static str {
        "csv"
    }

    fn save(&self, writer: &mut impl Write, chart: &LineChart) -> Result<()> {
        CsvWriter::new(writer).finish(&mut chart.data().clone())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{chart::line, COL};

    fn test_chart() -> LineChart {
        let df = df!(
            COL::DATES => &["2020-03-01", "2020-03-02"],
            COL::MODE => &["Confirmed", "Deaths"],
            COL::COUNTRY => &["US", "US"],
            COL::CASES => &[2.5, 1.0]
        )
        .unwrap();
        line(df, true, false).properties(900, 500, "Absolute <new> Cases/deaths")
    }

    #[test]
    fn html_formatter_should_work() {
        let output = HtmlFormatter.format(&test_chart());
        assert!(output.is_ok(), "Output should not error");
        let output = output.unwrap();
        assert!(output.starts_with("<!DOCTYPE html>"));
        assert!(output.contains("<title>Absolute &lt;new&gt; Cases/deaths</title>"));
        for src in VEGA_SCRIPTS {
            assert!(output.contains(src), "Page should load {src}");
        }
        assert!(output.contains(r#""interpolate":"basis""#));
        assert!(output.contains(r##"vegaEmbed("#vis", spec, embedOpt)"##));
        assert!(
            !output.contains("<new>"),
            "Title should be escaped both in the page and in the embedded spec"
        );
    }

    #[test]
    fn vega_lite_formatter_should_work() {
        let output = VegaLiteFormatter.format(&test_chart()).unwrap();
        let spec: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(spec["title"], "Absolute <new> Cases/deaths");
        assert_eq!(spec["encoding"]["y"]["scale"]["domain"][1], 2.5);
        assert!(output.ends_with('\n'));
    }

    #[test]
    fn csv_formatter_should_work() {
        let output = CSVFormatter.format(&test_chart());
        let correct_str = [
            "Dates,Mode,Country,cases",
            "2020-03-01,Confirmed,US,2.5",
            "2020-03-02,Deaths,US,1.0",
            "",
        ]
        .join("\n");

        assert!(output.is_ok(), "Output should not error");
        assert_eq!(output.unwrap(), correct_str, "Output should be correct");
    }

    #[test]
    fn formatter_enum_should_dispatch() {
        let formatter = OutputFormatter::from(VegaLiteFormatter);
        assert_eq!(formatter.extension(), "vl.json");
        assert!(formatter.format(&test_chart()).is_ok());
    }
}
