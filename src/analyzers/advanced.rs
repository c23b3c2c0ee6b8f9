use crate::config::Thresholds;
use crate::error::{DashboardError, Result};
use crate::models::{AirQualityCategory, AirQualityDataset, FilterSelection, Pollutant};
use crate::processors::{self, filter, DailyMean, PollutantMeans};
use crate::utils::constants::{DEFAULT_RFM_WINDOW_DAYS, MAX_RFM_WINDOW_DAYS};
use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Recency, frequency and magnitude of PM2.5 exceedances in the trailing window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RfmSummary {
    pub threshold: f64,
    pub window_days: i64,
    pub latest_date: NaiveDate,
    pub window_start: NaiveDate,
    /// Days since the last exceedance day, `None` when no day ever exceeded
    pub recency_days: Option<i64>,
    pub frequency: usize,
    /// Mean excess over the threshold on exceedance days inside the window
    pub magnitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyClassification {
    pub date: NaiveDate,
    pub pm25: Option<f64>,
    pub category: Option<AirQualityCategory>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryDistribution {
    /// All five categories in ordinal order, zero counts included
    pub counts: Vec<(AirQualityCategory, usize)>,
    pub uncategorised: usize,
}

impl CategoryDistribution {
    pub fn from_days(days: &[DailyClassification]) -> Self {
        let mut counts: BTreeMap<AirQualityCategory, usize> =
            AirQualityCategory::ALL.iter().map(|c| (*c, 0)).collect();
        let mut uncategorised = 0;

        for day in days {
            match day.category {
                Some(category) => *counts.entry(category).or_default() += 1,
                None => uncategorised += 1,
            }
        }

        Self {
            counts: counts.into_iter().collect(),
            uncategorised,
        }
    }

    pub fn get(&self, category: AirQualityCategory) -> usize {
        self.counts
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.iter().map(|(_, n)| n).sum::<usize>() + self.uncategorised
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Exceedance {
    pub days: usize,
    pub percentage: f64,
}

/// One calendar year of daily means for the selected station.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearlyRecapRow {
    pub year: i32,
    pub total_days: usize,
    pub means: PollutantMeans,
    pub exceedances: BTreeMap<Pollutant, Exceedance>,
}

impl YearlyRecapRow {
    pub fn mean(&self, pollutant: Pollutant) -> Option<f64> {
        self.means.get(&pollutant).copied().flatten()
    }

    pub fn exceedance(&self, pollutant: Pollutant) -> Option<Exceedance> {
        self.exceedances.get(&pollutant).copied()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    pub mean_pm25: f64,
    pub category: AirQualityCategory,
    pub advice: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdvancedReport {
    pub station: String,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub daily: Vec<DailyMean>,
    pub classified: Vec<DailyClassification>,
    pub rfm: Option<RfmSummary>,
    pub categories: CategoryDistribution,
    pub yearly: Vec<YearlyRecapRow>,
    pub verdict: Option<Verdict>,
    pub notice: Option<String>,
}

impl AdvancedReport {
    pub fn is_empty(&self) -> bool {
        self.daily.is_empty()
    }
}

/// Per-station daily analysis: RFM, category distribution, yearly WHO recap and verdict.
pub struct AdvancedAnalyzer {
    thresholds: Thresholds,
    window_days: i64,
}

impl AdvancedAnalyzer {
    pub fn new(thresholds: Thresholds) -> Self {
        Self {
            thresholds,
            window_days: DEFAULT_RFM_WINDOW_DAYS,
        }
    }

    pub fn with_window_days(mut self, window_days: i64) -> Self {
        self.window_days = window_days.clamp(1, MAX_RFM_WINDOW_DAYS);
        self
    }

    /// Analyze one station. Without a station the first in sorted order is used;
    /// without dates the station's own first and last dates are used.
    pub fn analyze(
        &self,
        dataset: &AirQualityDataset,
        station: Option<&str>,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<AdvancedReport> {
        let station = match station {
            Some(s) => s.to_string(),
            None => dataset
                .stations()
                .into_iter()
                .next()
                .ok_or_else(|| DashboardError::EmptyDataset("dataset".to_string()))?,
        };

        let bounds = dataset.station_date_bounds(&station);
        let selection = FilterSelection::new()
            .with_stations([station.clone()])
            .with_date_range(start.or(bounds.map(|b| b.0)), end.or(bounds.map(|b| b.1)));

        let rows = filter::apply(dataset, &selection)?;
        let daily = processors::daily_means(&rows);
        info!(
            "Advanced page: station {} has {} rows over {} days",
            station,
            rows.len(),
            daily.len()
        );

        if daily.is_empty() {
            warn!("No data for station {} in the selected range", station);
            return Ok(AdvancedReport {
                station: station.clone(),
                start: selection.start,
                end: selection.end,
                daily,
                classified: Vec::new(),
                rfm: None,
                categories: CategoryDistribution::from_days(&[]),
                yearly: Vec::new(),
                verdict: None,
                notice: Some(format!(
                    "No data available for station {} in the selected date range.",
                    station
                )),
            });
        }

        let classified = classify_days(&daily);
        let rfm = self.rfm_summary(&daily);
        let categories = CategoryDistribution::from_days(&classified);
        let yearly = self.yearly_recap(&daily);
        let verdict = verdict(&daily);
        debug!("RFM: {:?}", rfm);

        Ok(AdvancedReport {
            station,
            start: selection.start,
            end: selection.end,
            daily,
            classified,
            rfm,
            categories,
            yearly,
            verdict,
            notice: None,
        })
    }

    /// RFM over daily means. The window covers `latest - window_days` through `latest`
    /// inclusive; recency looks at every day, not only the window.
    pub fn rfm_summary(&self, daily: &[DailyMean]) -> Option<RfmSummary> {
        let latest_date = daily.iter().map(|d| d.date).max()?;
        let threshold = self.thresholds.pm25;
        let window_start = Duration::try_days(self.window_days)
            .and_then(|span| latest_date.checked_sub_signed(span))
            .unwrap_or(NaiveDate::MIN);

        let exceeds = |d: &&DailyMean| d.get(Pollutant::Pm25).is_some_and(|v| v > threshold);

        let recency_days = daily
            .iter()
            .filter(exceeds)
            .map(|d| d.date)
            .max()
            .map(|last| (latest_date - last).num_days());

        let excess: Vec<f64> = daily
            .iter()
            .filter(|d| d.date >= window_start)
            .filter(exceeds)
            .filter_map(|d| d.get(Pollutant::Pm25))
            .map(|v| v - threshold)
            .collect();

        let magnitude = processors::mean(excess.iter().map(|v| Some(*v))).unwrap_or(0.0);

        Some(RfmSummary {
            threshold,
            window_days: self.window_days,
            latest_date,
            window_start,
            recency_days,
            frequency: excess.len(),
            magnitude,
        })
    }

    /// Per year: day count, mean of each pollutant and exceedance days against the thresholds
    pub fn yearly_recap(&self, daily: &[DailyMean]) -> Vec<YearlyRecapRow> {
        let mut years: BTreeMap<i32, Vec<&DailyMean>> = BTreeMap::new();
        for day in daily {
            years.entry(day.date.year()).or_default().push(day);
        }

        years
            .into_iter()
            .map(|(year, days)| {
                let total_days = days.len();
                let means = Pollutant::ALL
                    .iter()
                    .map(|p| (*p, processors::mean(days.iter().map(|d| d.get(*p)))))
                    .collect();
                let exceedances = Pollutant::ALL
                    .iter()
                    .map(|p| {
                        let limit = self.thresholds.get(*p);
                        let exceeded = days
                            .iter()
                            .filter(|d| d.get(*p).is_some_and(|v| v > limit))
                            .count();
                        let exceedance = Exceedance {
                            days: exceeded,
                            percentage: 100.0 * exceeded as f64 / total_days as f64,
                        };
                        (*p, exceedance)
                    })
                    .collect();

                YearlyRecapRow {
                    year,
                    total_days,
                    means,
                    exceedances,
                }
            })
            .collect()
    }
}

impl Default for AdvancedAnalyzer {
    fn default() -> Self {
        Self::new(Thresholds::default())
    }
}

pub fn classify_days(daily: &[DailyMean]) -> Vec<DailyClassification> {
    daily
        .iter()
        .map(|d| {
            let pm25 = d.get(Pollutant::Pm25);
            DailyClassification {
                date: d.date,
                pm25,
                category: AirQualityCategory::classify(pm25),
            }
        })
        .collect()
}

/// Overall conclusion from the mean of daily PM2.5 means; `None` without PM2.5 data
pub fn verdict(daily: &[DailyMean]) -> Option<Verdict> {
    let mean_pm25 = processors::mean(daily.iter().map(|d| d.get(Pollutant::Pm25)))?;
    let category = AirQualityCategory::from_overall_mean(mean_pm25);
    Some(Verdict {
        mean_pm25,
        category,
        advice: category.advice().to_string(),
    })
}
