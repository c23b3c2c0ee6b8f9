use crate::models::{MetVariable, Pollutant, Reading, Variable};
use crate::utils::constants::{HOURS_PER_DAY, WEEKDAY_ORDER};
use chrono::{NaiveDate, Weekday};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Running mean that skips missing values.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeanAccumulator {
    sum: f64,
    count: usize,
}

impl MeanAccumulator {
    pub fn push(&mut self, value: Option<f64>) {
        if let Some(v) = value.filter(|v| v.is_finite()) {
            self.sum += v;
            self.count += 1;
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / self.count as f64)
        }
    }
}

/// Mean of the present values; `None` when nothing is present
pub fn mean<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let mut acc = MeanAccumulator::default();
    for v in values {
        acc.push(v);
    }
    acc.mean()
}

/// Mean pollutant values keyed by pollutant column.
pub type PollutantMeans = BTreeMap<Pollutant, Option<f64>>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearlyStationMean {
    pub year: i32,
    pub station: String,
    pub means: PollutantMeans,
}

impl YearlyStationMean {
    pub fn get(&self, pollutant: Pollutant) -> Option<f64> {
        self.means.get(&pollutant).copied().flatten()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HourlyMean {
    pub hour: u32,
    pub mean: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekdayMean {
    pub weekday: String,
    pub mean: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterSeries {
    pub x: MetVariable,
    pub y: Pollutant,
    pub points: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub variables: Vec<Variable>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: Variable, b: Variable) -> Option<f64> {
        let i = self.variables.iter().position(|v| *v == a)?;
        let j = self.variables.iter().position(|v| *v == b)?;
        self.values[i][j]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RainComparisonRow {
    pub raining: bool,
    pub hours: usize,
    pub mean_pm25: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyMean {
    pub date: NaiveDate,
    pub means: PollutantMeans,
}

impl DailyMean {
    pub fn get(&self, pollutant: Pollutant) -> Option<f64> {
        self.means.get(&pollutant).copied().flatten()
    }
}

pub fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Mean of each pollutant per (year, station), sorted by year then station
pub fn yearly_station_means(rows: &[&Reading], pollutants: &[Pollutant]) -> Vec<YearlyStationMean> {
    let mut groups: BTreeMap<(i32, &str), Vec<MeanAccumulator>> = BTreeMap::new();

    for r in rows {
        let accs = groups
            .entry((r.year(), r.station.as_str()))
            .or_insert_with(|| vec![MeanAccumulator::default(); pollutants.len()]);
        for (acc, p) in accs.iter_mut().zip(pollutants) {
            acc.push(r.pollutant(*p));
        }
    }

    groups
        .into_iter()
        .map(|((year, station), accs)| YearlyStationMean {
            year,
            station: station.to_string(),
            means: pollutants
                .iter()
                .zip(accs)
                .map(|(p, acc)| (*p, acc.mean()))
                .collect(),
        })
        .collect()
}

/// One row per hour of day, 0 through 23
pub fn hourly_means(rows: &[&Reading], pollutant: Pollutant) -> Vec<HourlyMean> {
    let mut accs = [MeanAccumulator::default(); HOURS_PER_DAY as usize];
    for r in rows {
        accs[r.hour() as usize].push(r.pollutant(pollutant));
    }

    accs.iter()
        .enumerate()
        .map(|(hour, acc)| HourlyMean {
            hour: hour as u32,
            mean: acc.mean(),
        })
        .collect()
}

/// One row per weekday, always Monday through Sunday
pub fn weekday_means(rows: &[&Reading], pollutant: Pollutant) -> Vec<WeekdayMean> {
    let mut accs: HashMap<Weekday, MeanAccumulator> = HashMap::new();
    for r in rows {
        accs.entry(r.weekday()).or_default().push(r.pollutant(pollutant));
    }

    WEEKDAY_ORDER
        .iter()
        .map(|day| WeekdayMean {
            weekday: weekday_name(*day).to_string(),
            mean: accs.get(day).and_then(|acc| acc.mean()),
        })
        .collect()
}

/// Points where both the met variable and the pollutant are present
pub fn scatter_points(rows: &[&Reading], x: MetVariable, y: Pollutant) -> ScatterSeries {
    let points = rows
        .iter()
        .filter_map(|r| Some((r.met(x)?, r.pollutant(y)?)))
        .collect();
    ScatterSeries { x, y, points }
}

/// Pearson correlation over pairwise-complete observations
pub fn pearson(pairs: &[(f64, f64)]) -> Option<f64> {
    let n = pairs.len();
    if n < 2 {
        return None;
    }

    let nf = n as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / nf;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / nf;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (x, y) in pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some((cov / (var_x * var_y).sqrt()).clamp(-1.0, 1.0))
}

pub fn correlation_matrix(rows: &[&Reading], variables: &[Variable]) -> CorrelationMatrix {
    let n = variables.len();
    let pairs: Vec<(usize, usize)> = (0..n).flat_map(|i| (i..n).map(move |j| (i, j))).collect();

    let computed: Vec<((usize, usize), Option<f64>)> = pairs
        .par_iter()
        .map(|&(i, j)| {
            let (a, b) = (variables[i], variables[j]);
            let observations: Vec<(f64, f64)> = rows
                .iter()
                .filter_map(|r| Some((r.value(a)?, r.value(b)?)))
                .collect();
            let r = pearson(&observations);
            // Diagonal is exactly one whenever the column varies
            let r = if i == j { r.map(|_| 1.0) } else { r };
            ((i, j), r)
        })
        .collect();

    let mut values = vec![vec![None; n]; n];
    for ((i, j), r) in computed {
        values[i][j] = r;
        values[j][i] = r;
    }

    CorrelationMatrix {
        variables: variables.to_vec(),
        values,
    }
}

/// Mean PM2.5 for dry hours then rainy hours; groups without rows are omitted
pub fn rain_comparison(rows: &[&Reading]) -> Vec<RainComparisonRow> {
    let mut dry = (0usize, MeanAccumulator::default());
    let mut wet = (0usize, MeanAccumulator::default());

    for r in rows {
        let group = if r.is_raining() { &mut wet } else { &mut dry };
        group.0 += 1;
        group.1.push(r.pollutant(Pollutant::Pm25));
    }

    [(false, dry), (true, wet)]
        .into_iter()
        .filter(|(_, (hours, _))| *hours > 0)
        .map(|(raining, (hours, acc))| RainComparisonRow {
            raining,
            hours,
            mean_pm25: acc.mean(),
        })
        .collect()
}

/// Per calendar date mean of all six pollutants, sorted by date
pub fn daily_means(rows: &[&Reading]) -> Vec<DailyMean> {
    let mut days: BTreeMap<NaiveDate, [MeanAccumulator; 6]> = BTreeMap::new();
    for r in rows {
        let accs = days.entry(r.date()).or_default();
        for (acc, p) in accs.iter_mut().zip(Pollutant::ALL) {
            acc.push(r.pollutant(p));
        }
    }

    days.into_iter()
        .map(|(date, accs)| DailyMean {
            date,
            means: Pollutant::ALL
                .iter()
                .zip(accs.iter())
                .map(|(p, acc)| (*p, acc.mean()))
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use pretty_assertions::assert_eq;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn pm(station: &str, dt: NaiveDateTime, pm25: Option<f64>) -> Reading {
        let mut r = Reading::new(dt, station);
        r.pm25 = pm25;
        r
    }

    #[test]
    fn test_mean_skips_missing_and_empty_is_none() {
        assert_eq!(mean(vec![Some(1.0), None, Some(3.0)]), Some(2.0));
        assert_eq!(mean(vec![None, None]), None);
        assert_eq!(mean(Vec::<Option<f64>>::new()), None);
    }

    #[test]
    fn test_yearly_station_means() {
        let readings = vec![
            pm("B", at(2014, 1, 1, 0), Some(10.0)),
            pm("A", at(2014, 1, 1, 0), Some(20.0)),
            pm("A", at(2014, 6, 1, 0), Some(40.0)),
            pm("A", at(2015, 1, 1, 0), None),
        ];
        let rows: Vec<&Reading> = readings.iter().collect();

        let means = yearly_station_means(&rows, &[Pollutant::Pm25]);
        let summary: Vec<(i32, &str, Option<f64>)> = means
            .iter()
            .map(|m| (m.year, m.station.as_str(), m.get(Pollutant::Pm25)))
            .collect();

        assert_eq!(
            summary,
            vec![
                (2014, "A", Some(30.0)),
                (2014, "B", Some(10.0)),
                (2015, "A", None),
            ]
        );
    }

    #[test]
    fn test_hourly_means_has_24_rows() {
        let readings = vec![
            pm("A", at(2014, 1, 1, 5), Some(10.0)),
            pm("A", at(2014, 1, 2, 5), Some(30.0)),
        ];
        let rows: Vec<&Reading> = readings.iter().collect();

        let hourly = hourly_means(&rows, Pollutant::Pm25);
        assert_eq!(hourly.len(), 24);
        assert_eq!(hourly[5].mean, Some(20.0));
        assert_eq!(hourly[0].mean, None);
    }

    #[test]
    fn test_weekday_means_canonical_order() {
        // 2014-01-05 is a Sunday, 2014-01-06 a Monday
        let readings = vec![
            pm("A", at(2014, 1, 5, 0), Some(50.0)),
            pm("A", at(2014, 1, 6, 0), Some(10.0)),
        ];
        let rows: Vec<&Reading> = readings.iter().collect();

        let weekly = weekday_means(&rows, Pollutant::Pm25);
        let names: Vec<&str> = weekly.iter().map(|w| w.weekday.as_str()).collect();
        assert_eq!(
            names,
            vec!["Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday"]
        );
        assert_eq!(weekly[0].mean, Some(10.0));
        assert_eq!(weekly[6].mean, Some(50.0));
        assert_eq!(weekly[3].mean, None);
    }

    #[test]
    fn test_pearson() {
        let perfect = [(1.0, 2.0), (2.0, 4.0), (3.0, 6.0)];
        assert!((pearson(&perfect).unwrap() - 1.0).abs() < 1e-12);

        let inverse = [(1.0, 3.0), (2.0, 2.0), (3.0, 1.0)];
        assert!((pearson(&inverse).unwrap() + 1.0).abs() < 1e-12);

        assert_eq!(pearson(&[(1.0, 1.0)]), None);
        assert_eq!(pearson(&[(1.0, 1.0), (1.0, 2.0)]), None);
    }

    #[test]
    fn test_correlation_matrix_pairwise_complete() {
        let mut readings = Vec::new();
        for (i, (temp, pm25)) in [(1.0, 10.0), (2.0, 20.0), (3.0, 30.0), (4.0, 35.0)]
            .iter()
            .enumerate()
        {
            let mut r = pm("A", at(2014, 1, 1, i as u32), Some(*pm25));
            r.temp = Some(*temp);
            readings.push(r);
        }
        // Missing temperature must not drop the row from other pairs
        readings.push(pm("A", at(2014, 1, 1, 10), Some(12.0)));
        let rows: Vec<&Reading> = readings.iter().collect();

        let vars = vec![
            Variable::Met(MetVariable::Temp),
            Variable::Pollutant(Pollutant::Pm25),
            Variable::Met(MetVariable::Rain),
        ];
        let matrix = correlation_matrix(&rows, &vars);

        assert_eq!(matrix.get(vars[0], vars[0]), Some(1.0));
        assert_eq!(matrix.get(vars[1], vars[1]), Some(1.0));
        let r = matrix.get(vars[0], vars[1]).unwrap();
        assert!(r > 0.9 && r <= 1.0);
        assert_eq!(matrix.get(vars[0], vars[1]), matrix.get(vars[1], vars[0]));
        assert_eq!(matrix.get(vars[2], vars[1]), None);
    }

    #[test]
    fn test_rain_comparison() {
        let mut wet = pm("A", at(2014, 1, 1, 0), Some(20.0));
        wet.rain = Some(0.3);
        let mut dry = pm("A", at(2014, 1, 1, 1), Some(80.0));
        dry.rain = Some(0.0);
        let unknown = pm("A", at(2014, 1, 1, 2), Some(100.0));
        let readings = vec![wet, dry, unknown];
        let rows: Vec<&Reading> = readings.iter().collect();

        let comparison = rain_comparison(&rows);
        assert_eq!(
            comparison,
            vec![
                RainComparisonRow {
                    raining: false,
                    hours: 2,
                    mean_pm25: Some(90.0)
                },
                RainComparisonRow {
                    raining: true,
                    hours: 1,
                    mean_pm25: Some(20.0)
                },
            ]
        );

        let dry_only: Vec<&Reading> = rows[1..].to_vec();
        assert_eq!(rain_comparison(&dry_only).len(), 1);
    }

    #[test]
    fn test_daily_means() {
        let readings = vec![
            pm("A", at(2014, 1, 1, 0), Some(10.0)),
            pm("A", at(2014, 1, 1, 12), Some(30.0)),
            pm("A", at(2014, 1, 2, 0), None),
        ];
        let rows: Vec<&Reading> = readings.iter().collect();

        let daily = daily_means(&rows);
        assert_eq!(daily.len(), 2);
        assert_eq!(daily[0].get(Pollutant::Pm25), Some(20.0));
        assert_eq!(daily[1].get(Pollutant::Pm25), None);
        assert_eq!(daily[0].get(Pollutant::O3), None);
    }

    #[test]
    fn test_scatter_points_require_both_values() {
        let mut with_temp = pm("A", at(2014, 1, 1, 0), Some(10.0));
        with_temp.temp = Some(-2.0);
        let without_temp = pm("A", at(2014, 1, 1, 1), Some(12.0));
        let readings = vec![with_temp, without_temp];
        let rows: Vec<&Reading> = readings.iter().collect();

        let series = scatter_points(&rows, MetVariable::Temp, Pollutant::Pm25);
        assert_eq!(series.points, vec![(-2.0, 10.0)]);
    }
}
