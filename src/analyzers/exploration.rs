use crate::error::{DashboardError, Result};
use crate::models::{AirQualityDataset, FilterSelection, Pollutant, RainState, Reading, Variable};
use crate::processors::{
    self, filter, CorrelationMatrix, DataQualityChecker, DataQualityReport, HourlyMean,
    RainComparisonRow, ScatterSeries, WeekdayMean, YearlyStationMean,
};
use crate::utils::describe_range;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

pub const NO_MET_VARIABLE_NOTICE: &str = "Select at least one meteorological variable to display.";

/// Topics of the interpretive notes closing the exploration page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InsightTopic {
    Trend,
    Pattern,
    Meteorology,
    Rain,
}

impl InsightTopic {
    pub const ALL: [InsightTopic; 4] = [
        InsightTopic::Trend,
        InsightTopic::Pattern,
        InsightTopic::Meteorology,
        InsightTopic::Rain,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            InsightTopic::Trend => "Yearly trends",
            InsightTopic::Pattern => "Daily and weekly patterns",
            InsightTopic::Meteorology => "Meteorological influence",
            InsightTopic::Rain => "Rain impact",
        }
    }

    pub fn notes(&self) -> &'static [&'static str] {
        match self {
            InsightTopic::Trend => &[
                "Trends differ between stations for the selected pollutants.",
                "Diverging trends point at regional differences between station surroundings.",
            ],
            InsightTopic::Pattern => &[
                "Pollutant levels fluctuate with the hour of day and the day of week.",
                "These cycles reflect human activity as well as atmospheric conditions.",
            ],
            InsightTopic::Meteorology => &[
                "Temperature, pressure, dew point and rainfall relate to PM2.5 in different ways.",
                "The relationships help identify weather conditions that favour pollution build-up.",
            ],
            InsightTopic::Rain => &[
                "Rain tends to lower PM2.5 concentrations through wet deposition.",
                "Weather plays a visible role in reducing particulate pollution.",
            ],
        }
    }
}

impl fmt::Display for InsightTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title())
    }
}

impl FromStr for InsightTopic {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trend" | "trends" => Ok(InsightTopic::Trend),
            "pattern" | "patterns" => Ok(InsightTopic::Pattern),
            "meteorology" | "met" => Ok(InsightTopic::Meteorology),
            "rain" => Ok(InsightTopic::Rain),
            _ => Err(format!(
                "unknown insight '{}' (expected trend, pattern, meteorology or rain)",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Insight {
    pub topic: InsightTopic,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RainSection {
    pub state: RainState,
    pub label: String,
    pub rows: Vec<RainComparisonRow>,
}

/// Everything shown on the exploration page for one filter selection.
#[derive(Debug, Clone, Serialize)]
pub struct ExplorationReport {
    pub stations: Vec<String>,
    pub date_range: String,
    pub row_count: usize,
    pub quality: DataQualityReport,
    pub trend_pollutants: Vec<Pollutant>,
    pub yearly: Vec<YearlyStationMean>,
    pub pattern_pollutant: Pollutant,
    pub hourly: Vec<HourlyMean>,
    pub weekday: Vec<WeekdayMean>,
    pub scatter: Vec<ScatterSeries>,
    pub scatter_notice: Option<String>,
    pub correlation: CorrelationMatrix,
    pub rain: RainSection,
    pub insights: Vec<Insight>,
}

impl ExplorationReport {
    /// Yearly series for one pollutant: `(station, [(year, mean)])`
    pub fn trend_series(&self, pollutant: Pollutant) -> Vec<(String, Vec<(i32, Option<f64>)>)> {
        let mut series: Vec<(String, Vec<(i32, Option<f64>)>)> = Vec::new();
        for row in &self.yearly {
            let point = (row.year, row.get(pollutant));
            match series.iter_mut().find(|(s, _)| *s == row.station) {
                Some((_, points)) => points.push(point),
                None => series.push((row.station.clone(), vec![point])),
            }
        }
        series.sort_by(|a, b| a.0.cmp(&b.0));
        series
    }
}

pub struct ExplorationAnalyzer {
    max_workers: usize,
}

impl ExplorationAnalyzer {
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers: max_workers.max(1),
        }
    }

    pub fn analyze(
        &self,
        dataset: &AirQualityDataset,
        selection: &FilterSelection,
        insights: &[InsightTopic],
    ) -> Result<ExplorationReport> {
        let rows = filter::apply(dataset, selection)?;
        info!("Exploration page: {} rows after filtering", rows.len());

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.max_workers)
            .build()
            .map_err(|e| DashboardError::Config(e.to_string()))?;

        let ((quality, yearly), ((hourly, weekday), (scatter, (correlation, rain_rows)))) =
            pool.install(|| {
                rayon::join(
                    || {
                        (
                            DataQualityChecker::new().check(&rows),
                            processors::yearly_station_means(&rows, &selection.trend_pollutants),
                        )
                    },
                    || {
                        rayon::join(
                            || {
                                (
                                    processors::hourly_means(&rows, selection.pattern_pollutant),
                                    processors::weekday_means(&rows, selection.pattern_pollutant),
                                )
                            },
                            || {
                                rayon::join(
                                    || self.scatter_panels(&rows, selection),
                                    || {
                                        rayon::join(
                                            || {
                                                processors::correlation_matrix(
                                                    &rows,
                                                    &Variable::correlation_set(),
                                                )
                                            },
                                            || {
                                                let subset = filter::apply_rain_state(
                                                    &rows,
                                                    selection.rain_state,
                                                );
                                                processors::rain_comparison(&subset)
                                            },
                                        )
                                    },
                                )
                            },
                        )
                    },
                )
            });

        let scatter_notice = if selection.met_variables.is_empty() {
            Some(NO_MET_VARIABLE_NOTICE.to_string())
        } else {
            None
        };

        let stations = if selection.stations.is_empty() {
            dataset.stations()
        } else {
            selection.stations.clone()
        };

        debug!(
            "Computed {} yearly rows, {} scatter panels",
            yearly.len(),
            scatter.len()
        );

        Ok(ExplorationReport {
            stations,
            date_range: describe_range(
                selection,
                AirQualityDataset::bounds_of(rows.iter().copied()),
            ),
            row_count: rows.len(),
            quality,
            trend_pollutants: selection.trend_pollutants.clone(),
            yearly,
            pattern_pollutant: selection.pattern_pollutant,
            hourly,
            weekday,
            scatter,
            scatter_notice,
            correlation,
            rain: RainSection {
                state: selection.rain_state,
                label: selection.rain_state.label().to_string(),
                rows: rain_rows,
            },
            insights: insights
                .iter()
                .map(|topic| Insight {
                    topic: *topic,
                    notes: topic.notes().iter().map(|n| n.to_string()).collect(),
                })
                .collect(),
        })
    }

    fn scatter_panels(&self, rows: &[&Reading], selection: &FilterSelection) -> Vec<ScatterSeries> {
        selection
            .met_variables
            .iter()
            .map(|met| processors::scatter_points(rows, *met, Pollutant::Pm25))
            .collect()
    }
}

impl Default for ExplorationAnalyzer {
    fn default() -> Self {
        Self::new(num_cpus::get())
    }
}
