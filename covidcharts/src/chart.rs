//! Declarative line charts over a tidy table, serialized as Vega-Lite specifications.

use std::collections::BTreeMap;

use anyhow::{anyhow, Result};
use itertools::Itertools;
use polars::prelude::*;
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::COL;

pub const VEGA_LITE_SCHEMA: &str = "https://vega.github.io/schema/vega-lite/v4.17.0.json";

const COUNTRY_SELECTOR: &str = "selector001";
const MODE_SELECTOR: &str = "selector002";

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct VegaLiteSpec {
    #[serde(rename = "$schema")]
    pub schema: String,
    pub data: InlineData,
    pub mark: Mark,
    pub encoding: Encoding,
    pub selection: BTreeMap<String, Selection>,
    pub transform: Vec<Transform>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct InlineData {
    pub values: Vec<Map<String, Value>>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Mark {
    #[serde(rename = "type")]
    pub mark_type: String,
    pub interpolate: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Encoding {
    pub x: FieldDef,
    pub y: FieldDef,
    pub color: FieldDef,
    pub stroke_dash: FieldDef,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Temporal,
    Quantitative,
    Nominal,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub field: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<Scale>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub axis: Option<Axis>,
}

impl FieldDef {
    fn new(field: &str, field_type: FieldType) -> Self {
        Self {
            field: field.into(),
            field_type,
            scale: None,
            axis: None,
        }
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ScaleType {
    Linear,
    Log,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Domain {
    Numeric(Vec<f64>),
    Nominal(Vec<String>),
}

#[derive(Serialize, Debug, Clone, PartialEq, Default)]
pub struct Scale {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub scale_type: Option<ScaleType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<Domain>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Axis {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    pub title: String,
    pub orient: String,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SelectionType {
    Single,
    Multi,
}

/// A selection toggled by clicking the legend of its field.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Selection {
    #[serde(rename = "type")]
    pub selection_type: SelectionType,
    pub fields: Vec<String>,
    pub bind: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Transform {
    pub filter: Value,
}

/// Convert from polars `AnyValue` to `serde_json::Value`, covering the types a tidy table holds.
fn any_value_to_json(value: &AnyValue) -> Result<Value> {
    match value {
        AnyValue::Null => Ok(Value::Null),
        AnyValue::Boolean(b) => Ok(Value::Bool(*b)),
        AnyValue::String(s) => Ok(Value::String((*s).to_string())),
        AnyValue::Int32(n) => Ok(json!(*n)),
        AnyValue::Int64(n) => Ok(json!(*n)),
        AnyValue::UInt32(n) => Ok(json!(*n)),
        AnyValue::UInt64(n) => Ok(json!(*n)),
        AnyValue::Float32(n) => Ok(json!(*n)),
        AnyValue::Float64(n) => Ok(json!(*n)),
        other => Err(anyhow!("Failed to convert type: {other:?}")),
    }
}

/// One JSON object per row of `df`, keyed by column name.
fn records(df: &DataFrame) -> Result<Vec<Map<String, Value>>> {
    let mut rows = Vec::with_capacity(df.height());
    for idx in 0..df.height() {
        let mut row = Map::new();
        for column in df.get_columns() {
            row.insert(
                column.name().to_string(),
                any_value_to_json(&column.get(idx)?)?,
            );
        }
        rows.push(row);
    }
    Ok(rows)
}

/// Distinct values of a string column in order of first appearance.
fn unique_in_order(df: &DataFrame, column: &str) -> Result<Vec<String>> {
    Ok(df
        .column(column)?
        .str()?
        .into_iter()
        .flatten()
        .unique()
        .map(String::from)
        .collect())
}

/// A line chart of a tidy table with one line per (`Country`, `Mode`) pair. Built up with the
/// setter methods and turned into a `VegaLiteSpec` with `to_spec`.
#[derive(Debug, Clone)]
pub struct LineChart {
    data: DataFrame,
    log_scale: bool,
    relative_to_pop: bool,
    width: Option<u32>,
    height: Option<u32>,
    title: Option<String>,
}

/// Chart `df` (a tidy table) as lines, on a log scale if `log_scale`, labelling the y axis as
/// a share of the population if `relative_to_pop`.
pub fn line(df: DataFrame, log_scale: bool, relative_to_pop: bool) -> LineChart {
    LineChart::new(df)
        .log_scale(log_scale)
        .relative_to_pop(relative_to_pop)
}

impl LineChart {
    pub fn new(data: DataFrame) -> Self {
        Self {
            data,
            log_scale: false,
            relative_to_pop: false,
            width: None,
            height: None,
            title: None,
        }
    }

    pub fn log_scale(mut self, log_scale: bool) -> Self {
        self.log_scale = log_scale;
        self
    }

    pub fn relative_to_pop(mut self, relative_to_pop: bool) -> Self {
        self.relative_to_pop = relative_to_pop;
        self
    }

    pub fn properties(mut self, width: u32, height: u32, title: &str) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self.title = Some(title.into());
        self
    }

    pub fn data(&self) -> &DataFrame {
        &self.data
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    fn y_scale(&self) -> Result<Scale> {
        if self.log_scale {
            let max = self.data.column(COL::CASES)?.f64()?.max().unwrap_or(1.0);
            Ok(Scale {
                scale_type: Some(ScaleType::Log),
                base: Some(10),
                domain: Some(Domain::Numeric(vec![1.0, max])),
            })
        } else {
            Ok(Scale {
                scale_type: Some(ScaleType::Linear),
                ..Default::default()
            })
        }
    }

    fn y_axis(&self) -> Axis {
        if self.relative_to_pop {
            Axis {
                format: Some("%".into()),
                title: "% of population".into(),
                orient: "right".into(),
            }
        } else {
            Axis {
                format: None,
                title: "Cases".into(),
                orient: "right".into(),
            }
        }
    }

    fn nominal(&self, field: &str) -> Result<FieldDef> {
        Ok(FieldDef {
            scale: Some(Scale {
                domain: Some(Domain::Nominal(unique_in_order(&self.data, field)?)),
                ..Default::default()
            }),
            ..FieldDef::new(field, FieldType::Nominal)
        })
    }

    pub fn to_spec(&self) -> Result<VegaLiteSpec> {
        let encoding = Encoding {
            x: FieldDef::new(COL::DATES, FieldType::Temporal),
            y: FieldDef {
                scale: Some(self.y_scale()?),
                axis: Some(self.y_axis()),
                ..FieldDef::new(COL::CASES, FieldType::Quantitative)
            },
            color: self.nominal(COL::COUNTRY)?,
            stroke_dash: self.nominal(COL::MODE)?,
        };
        let selection = BTreeMap::from([
            (
                COUNTRY_SELECTOR.to_string(),
                Selection {
                    selection_type: SelectionType::Multi,
                    fields: vec![COL::COUNTRY.into()],
                    bind: "legend".into(),
                },
            ),
            (
                MODE_SELECTOR.to_string(),
                Selection {
                    selection_type: SelectionType::Single,
                    fields: vec![COL::MODE.into()],
                    bind: "legend".into(),
                },
            ),
        ]);
        let transform = [COUNTRY_SELECTOR, MODE_SELECTOR]
            .into_iter()
            .map(|selector| Transform {
                filter: json!({ "selection": selector }),
            })
            .collect();

        Ok(VegaLiteSpec {
            schema: VEGA_LITE_SCHEMA.into(),
            data: InlineData {
                values: records(&self.data)?,
            },
            mark: Mark {
                mark_type: "line".into(),
                interpolate: "basis".into(),
            },
            encoding,
            selection,
            transform,
            width: self.width,
            height: self.height,
            title: self.title.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tidy_df() -> DataFrame {
        df!(
            COL::DATES => &["2020-03-01", "2020-03-02", "2020-03-01", "2020-03-02"],
            COL::MODE => &["Confirmed", "Confirmed", "Deaths", "Deaths"],
            COL::COUNTRY => &["US", "Cyprus", "US", "Cyprus"],
            COL::CASES => &[120.0, 3.0, 4.0, 1.0]
        )
        .unwrap()
    }

    fn spec_json(chart: &LineChart) -> Value {
        serde_json::to_value(chart.to_spec().unwrap()).unwrap()
    }

    #[test]
    fn log_scale_should_span_one_to_max() {
        let spec = spec_json(&line(tidy_df(), true, false));
        assert_eq!(
            spec["encoding"]["y"]["scale"],
            json!({"type": "log", "base": 10, "domain": [1.0, 120.0]})
        );
        assert_eq!(
            spec["encoding"]["y"]["axis"],
            json!({"title": "Cases", "orient": "right"})
        );
    }

    #[test]
    fn relative_chart_should_use_percentage_axis() {
        let spec = spec_json(&line(tidy_df(), false, true));
        assert_eq!(spec["encoding"]["y"]["scale"], json!({"type": "linear"}));
        assert_eq!(
            spec["encoding"]["y"]["axis"],
            json!({"format": "%", "title": "% of population", "orient": "right"})
        );
    }

    #[test]
    fn encoding_should_key_color_and_dash() {
        let spec = spec_json(&line(tidy_df(), false, false));
        assert_eq!(spec["mark"], json!({"type": "line", "interpolate": "basis"}));
        assert_eq!(
            spec["encoding"]["x"],
            json!({"field": "Dates", "type": "temporal"})
        );
        assert_eq!(
            spec["encoding"]["color"],
            json!({"field": "Country", "type": "nominal", "scale": {"domain": ["US", "Cyprus"]}})
        );
        assert_eq!(
            spec["encoding"]["strokeDash"],
            json!({"field": "Mode", "type": "nominal", "scale": {"domain": ["Confirmed", "Deaths"]}})
        );
    }

    #[test]
    fn legend_selections_should_filter_independently() {
        let spec = spec_json(&line(tidy_df(), false, false));
        assert_eq!(
            spec["selection"],
            json!({
                "selector001": {"type": "multi", "fields": ["Country"], "bind": "legend"},
                "selector002": {"type": "single", "fields": ["Mode"], "bind": "legend"}
            })
        );
        assert_eq!(
            spec["transform"],
            json!([
                {"filter": {"selection": "selector001"}},
                {"filter": {"selection": "selector002"}}
            ])
        );
    }

    #[test]
    fn properties_and_data_should_be_embedded() {
        let chart = line(tidy_df(), false, false).properties(900, 500, "Absolute total Cases/deaths");
        let spec = spec_json(&chart);
        assert_eq!(spec["$schema"], json!(VEGA_LITE_SCHEMA));
        assert_eq!(spec["width"], json!(900));
        assert_eq!(spec["height"], json!(500));
        assert_eq!(spec["title"], json!("Absolute total Cases/deaths"));
        assert_eq!(
            spec["data"]["values"][0],
            json!({"Dates": "2020-03-01", "Mode": "Confirmed", "Country": "US", "cases": 120.0})
        );
        assert_eq!(spec["data"]["values"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn unsized_chart_should_omit_properties() {
        let spec = spec_json(&line(tidy_df(), false, false));
        assert!(spec.get("width").is_none());
        assert!(spec.get("title").is_none());
    }
}
