use crate::error::{DashboardError, Result};
use crate::models::{AirQualityDataset, FilterSelection, MetVariable, RainState, Reading};

/// Rows of the dataset that fall inside the selection's date range and stations.
///
/// Date bounds are inclusive calendar dates. An empty station list keeps every
/// station; naming a station that is not in the dataset is an error.
pub fn apply<'a>(
    dataset: &'a AirQualityDataset,
    selection: &FilterSelection,
) -> Result<Vec<&'a Reading>> {
    selection.check()?;

    if let Some(unknown) = selection.stations.iter().find(|s| !dataset.has_station(s)) {
        return Err(DashboardError::StationNotFound {
            station: unknown.clone(),
            known: dataset.stations().join(", "),
        });
    }

    Ok(dataset
        .readings()
        .iter()
        .filter(|r| selection.includes_station(&r.station) && selection.includes_date(r.date()))
        .collect())
}

/// Restrict rows to rainy (RAIN > 0) or dry (RAIN == 0) hours.
///
/// Rows without a rain reading match neither state.
pub fn apply_rain_state<'a>(rows: &[&'a Reading], state: RainState) -> Vec<&'a Reading> {
    match state {
        RainState::All => rows.to_vec(),
        RainState::Rainy => rows
            .iter()
            .copied()
            .filter(|r| r.met(MetVariable::Rain).is_some_and(|v| v > 0.0))
            .collect(),
        RainState::Dry => rows
            .iter()
            .copied()
            .filter(|r| r.met(MetVariable::Rain).is_some_and(|v| v == 0.0))
            .collect(),
    }
}
