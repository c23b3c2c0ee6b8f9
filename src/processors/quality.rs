use crate::models::{MetVariable, Pollutant, Reading, Variable};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize)]
pub struct ColumnCompleteness {
    pub column: String,
    pub present: usize,
    pub missing: usize,
}

impl ColumnCompleteness {
    pub fn missing_percentage(&self) -> f64 {
        let total = self.present + self.missing;
        if total == 0 {
            0.0
        } else {
            100.0 * self.missing as f64 / total as f64
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StationCoverage {
    pub rows: usize,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize)]
pub struct DataQualityReport {
    pub total_rows: usize,
    pub columns: Vec<ColumnCompleteness>,
    pub stations: BTreeMap<String, StationCoverage>,
}

impl DataQualityReport {
    pub fn column(&self, name: &str) -> Option<&ColumnCompleteness> {
        self.columns.iter().find(|c| c.column == name)
    }
}

/// Counts missing values per numeric column and coverage per station.
pub struct DataQualityChecker;

impl DataQualityChecker {
    pub fn new() -> Self {
        Self
    }

    pub fn check(&self, rows: &[&Reading]) -> DataQualityReport {
        let variables: Vec<Variable> = Pollutant::ALL
            .iter()
            .map(|p| Variable::Pollutant(*p))
            .chain(MetVariable::ALL.iter().map(|m| Variable::Met(*m)))
            .collect();

        let mut present = vec![0usize; variables.len()];
        let mut stations: BTreeMap<String, StationCoverage> = BTreeMap::new();

        for r in rows {
            for (count, variable) in present.iter_mut().zip(&variables) {
                if r.value(*variable).is_some() {
                    *count += 1;
                }
            }

            let date = r.date();
            stations
                .entry(r.station.clone())
                .and_modify(|c| {
                    c.rows += 1;
                    c.first_date = c.first_date.min(date);
                    c.last_date = c.last_date.max(date);
                })
                .or_insert(StationCoverage {
                    rows: 1,
                    first_date: date,
                    last_date: date,
                });
        }

        let columns = variables
            .iter()
            .zip(present)
            .map(|(variable, present)| ColumnCompleteness {
                column: variable.column_name().to_string(),
                present,
                missing: rows.len() - present,
            })
            .collect();

        DataQualityReport {
            total_rows: rows.len(),
            columns,
            stations,
        }
    }

    pub fn generate_summary(&self, report: &DataQualityReport) -> String {
        let mut summary = String::new();

        summary.push_str("=== Data Quality Report ===\n");
        summary.push_str(&format!("Total Rows: {}\n", report.total_rows));
        summary.push_str(&format!("Stations: {}\n", report.stations.len()));

        summary.push_str("\nMissing Values:\n");
        for column in &report.columns {
            summary.push_str(&format!(
                "  {:<6} {:>8} missing ({:.1}%)\n",
                column.column,
                column.missing,
                column.missing_percentage()
            ));
        }

        summary.push_str("\nStation Coverage:\n");
        for (station, coverage) in &report.stations {
            summary.push_str(&format!(
                "  {:<16} {:>8} rows  {} to {}\n",
                station, coverage.rows, coverage.first_date, coverage.last_date
            ));
        }

        summary
    }
}

impl Default for DataQualityChecker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(station: &str, day: u32, pm25: Option<f64>) -> Reading {
        let dt = NaiveDate::from_ymd_opt(2015, 4, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let mut r = Reading::new(dt, station);
        r.pm25 = pm25;
        r
    }

    #[test]
    fn test_missing_counts() {
        let readings = vec![
            reading("Huairou", 1, Some(10.0)),
            reading("Huairou", 2, None),
            reading("Shunyi", 3, None),
            reading("Shunyi", 4, Some(8.0)),
        ];
        let rows: Vec<&Reading> = readings.iter().collect();

        let report = DataQualityChecker::new().check(&rows);
        assert_eq!(report.total_rows, 4);

        let pm25 = report.column("PM2.5").unwrap();
        assert_eq!(pm25.missing, 2);
        assert_eq!(pm25.missing_percentage(), 50.0);
        assert_eq!(report.column("TEMP").unwrap().missing, 4);

        let shunyi = &report.stations["Shunyi"];
        assert_eq!(shunyi.rows, 2);
        assert_eq!(shunyi.first_date, NaiveDate::from_ymd_opt(2015, 4, 3).unwrap());
        assert_eq!(shunyi.last_date, NaiveDate::from_ymd_opt(2015, 4, 4).unwrap());
    }

    #[test]
    fn test_summary_lists_every_column() {
        let readings = vec![reading("Huairou", 1, Some(10.0))];
        let rows: Vec<&Reading> = readings.iter().collect();

        let checker = DataQualityChecker::new();
        let summary = checker.generate_summary(&checker.check(&rows));
        assert!(summary.contains("=== Data Quality Report ==="));
        for name in ["PM2.5", "PM10", "SO2", "NO2", "CO", "O3", "TEMP", "PRES", "DEWP", "RAIN"] {
            assert!(summary.contains(name), "missing {}", name);
        }
        assert!(summary.contains("Huairou"));
    }

    #[test]
    fn test_empty_rows() {
        let report = DataQualityChecker::new().check(&[]);
        assert_eq!(report.total_rows, 0);
        assert!(report.stations.is_empty());
        assert_eq!(report.columns[0].missing_percentage(), 0.0);
    }
}
