use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::{Validate, ValidationError};

use crate::error::Result;
use crate::models::{MetVariable, Pollutant};

/// Optional rain-state restriction for the rain comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RainState {
    #[default]
    All,
    Rainy,
    Dry,
}

impl RainState {
    pub fn label(&self) -> &'static str {
        match self {
            RainState::All => "All days",
            RainState::Rainy => "Rainy days",
            RainState::Dry => "Dry days",
        }
    }
}

impl fmt::Display for RainState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for RainState {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(RainState::All),
            "rainy" | "rain" | "wet" => Ok(RainState::Rainy),
            "dry" | "no-rain" => Ok(RainState::Dry),
            _ => Err(format!("unknown rain state '{}' (expected all, rainy or dry)", s)),
        }
    }
}

/// Transient filter configuration for one render of a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_date_range"))]
pub struct FilterSelection {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    /// Empty means every station
    pub stations: Vec<String>,
    pub trend_pollutants: Vec<Pollutant>,
    pub pattern_pollutant: Pollutant,
    pub met_variables: Vec<MetVariable>,
    pub rain_state: RainState,
}

fn validate_date_range(selection: &FilterSelection) -> std::result::Result<(), ValidationError> {
    match (selection.start, selection.end) {
        (Some(start), Some(end)) if start > end => {
            let mut err = ValidationError::new("date_range");
            err.message = Some(format!("start date {} is after end date {}", start, end).into());
            Err(err)
        }
        _ => Ok(()),
    }
}

impl Default for FilterSelection {
    fn default() -> Self {
        Self {
            start: None,
            end: None,
            stations: Vec::new(),
            trend_pollutants: Pollutant::TREND.to_vec(),
            pattern_pollutant: Pollutant::Pm25,
            met_variables: MetVariable::ALL.to_vec(),
            rain_state: RainState::All,
        }
    }
}

impl FilterSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_date_range(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    pub fn with_stations<I, S>(mut self, stations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stations = stations.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_trend_pollutants(mut self, pollutants: Vec<Pollutant>) -> Self {
        self.trend_pollutants = pollutants;
        self
    }

    pub fn with_pattern_pollutant(mut self, pollutant: Pollutant) -> Self {
        self.pattern_pollutant = pollutant;
        self
    }

    pub fn with_met_variables(mut self, variables: Vec<MetVariable>) -> Self {
        self.met_variables = variables;
        self
    }

    pub fn with_rain_state(mut self, rain_state: RainState) -> Self {
        self.rain_state = rain_state;
        self
    }

    pub fn includes_date(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }

    pub fn includes_station(&self, station: &str) -> bool {
        self.stations.is_empty() || self.stations.iter().any(|s| s == station)
    }

    pub fn check(&self) -> Result<()> {
        self.validate()?;
        Ok(())
    }
}
