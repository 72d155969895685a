//! Population reference figures from the World Bank indicator API

use std::collections::{btree_map::Entry, BTreeMap};

use anyhow::Result;
use log::{debug, info, warn};
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;

use crate::error::CovidChartsError;

const OBSERVATIONS_PER_PAGE: &str = "20000";
const PAGING_PARAMETERS: [&str; 4] = ["format", "mrv", "per_page", "page"];

/// Latest total population per country, keyed by the time series country naming.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Population(BTreeMap<String, f64>);

impl Population {
    pub fn get(&self, country: &str) -> Option<f64> {
        self.0.get(country).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Renames countries from the reference naming to the time series naming, e.g.
    /// "United States" to "US".
    pub fn with_aliases(mut self, aliases: &BTreeMap<String, String>) -> Self {
        for (from, to) in aliases {
            match self.0.remove(from) {
                Some(value) => {
                    self.0.insert(to.clone(), value);
                }
                None => warn!("Population alias source '{from}' not present in the reference"),
            }
        }
        self
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for Population {
    fn from_iter<T: IntoIterator<Item = (S, f64)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

#[derive(Deserialize, Debug)]
struct Named {
    value: String,
}

#[derive(Deserialize, Debug)]
struct Observation {
    country: Named,
    date: String,
    value: Option<f64>,
}

/// Page counts have been served both as numbers and as strings.
fn as_count(value: Option<&Value>) -> Option<u32> {
    match value? {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Splits one API response `[page-info, observations]` into the total page count and its
/// observations.
fn parse_page(response: Value) -> Result<(u32, Vec<Observation>), CovidChartsError> {
    let Value::Array(mut parts) = response else {
        return Err(CovidChartsError::PopulationResponse(
            "expected a JSON array".into(),
        ));
    };
    if parts.len() != 2 {
        return Err(CovidChartsError::PopulationResponse(format!(
            "expected [page-info, observations], got {}",
            Value::Array(parts)
        )));
    }
    let observations = parts.pop().unwrap_or_default();
    let pages = as_count(parts[0].get("pages")).ok_or_else(|| {
        CovidChartsError::PopulationResponse(format!("missing page count in {}", parts[0]))
    })?;
    let observations: Vec<Observation> = serde_json::from_value(observations)
        .map_err(|err| CovidChartsError::PopulationResponse(err.to_string()))?;
    Ok((pages, observations))
}

/// `url` with the paging parameters set for `page`. Parameters already present in `url` are
/// replaced, any others are kept.
fn page_url(url: &str, page: u32) -> Result<Url> {
    let mut url = Url::parse(url)?;
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !PAGING_PARAMETERS.iter().any(|parameter| *parameter == &**key))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .extend_pairs([
            ("format", "json".to_string()),
            ("mrv", "1".to_string()),
            ("per_page", OBSERVATIONS_PER_PAGE.to_string()),
            ("page", page.to_string()),
        ]);
    Ok(url)
}

/// Keeps the most recent non-null observation for every country.
fn latest_values(observations: Vec<Observation>) -> BTreeMap<String, (String, f64)> {
    let mut latest: BTreeMap<String, (String, f64)> = BTreeMap::new();
    for observation in observations {
        let Some(value) = observation.value else {
            continue;
        };
        match latest.entry(observation.country.value) {
            Entry::Vacant(entry) => {
                entry.insert((observation.date, value));
            }
            Entry::Occupied(mut entry) => {
                if observation.date > entry.get().0 {
                    entry.insert((observation.date, value));
                }
            }
        }
    }
    latest
}

/// Download the latest total population for every country from the indicator endpoint at
/// `url`, following every page of the response, and apply the name `aliases`.
pub async fn download_population(
    url: &str,
    aliases: &BTreeMap<String, String>,
) -> Result<Population> {
    info!("Attempting to download population figures from {url}");
    let client = reqwest::Client::new();
    let mut observations = vec![];
    let mut page: u32 = 1;
    loop {
        let response: Value = client
            .get(page_url(url, page)?)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        let (pages, mut batch) = parse_page(response)?;
        debug!("Population page {page}/{pages}: {} observations", batch.len());
        observations.append(&mut batch);
        if page >= pages {
            break;
        }
        page += 1;
    }

    let population: Population = latest_values(observations)
        .into_iter()
        .map(|(country, (_, value))| (country, value))
        .collect();
    info!("Loaded population figures for {} countries", population.len());
    Ok(population.with_aliases(aliases))
}
