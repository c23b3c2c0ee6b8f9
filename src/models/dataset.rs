use chrono::NaiveDate;
use std::collections::BTreeSet;

use crate::models::Reading;

/// Immutable table of readings shared by every page render.
#[derive(Debug, Clone, Default)]
pub struct AirQualityDataset {
    readings: Vec<Reading>,
}

impl AirQualityDataset {
    /// Readings are kept sorted by station, then timestamp
    pub fn new(mut readings: Vec<Reading>) -> Self {
        readings.sort_by(|a, b| {
            a.station
                .cmp(&b.station)
                .then_with(|| a.datetime.cmp(&b.datetime))
        });
        Self { readings }
    }

    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Unique station names in sorted order
    pub fn stations(&self) -> Vec<String> {
        self.readings
            .iter()
            .map(|r| r.station.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    pub fn has_station(&self, station: &str) -> bool {
        self.readings.iter().any(|r| r.station == station)
    }

    pub fn date_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        Self::bounds_of(self.readings.iter())
    }

    pub fn station_date_bounds(&self, station: &str) -> Option<(NaiveDate, NaiveDate)> {
        Self::bounds_of(self.readings.iter().filter(|r| r.station == station))
    }

    /// First and last date among `readings`
    pub fn bounds_of<'a>(
        readings: impl Iterator<Item = &'a Reading>,
    ) -> Option<(NaiveDate, NaiveDate)> {
        readings.fold(None, |acc, r| {
            let d = r.date();
            Some(match acc {
                None => (d, d),
                Some((min, max)) => (min.min(d), max.max(d)),
            })
        })
    }
}
