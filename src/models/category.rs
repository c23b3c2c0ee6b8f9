use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils::constants::CATEGORY_BREAKPOINTS;

/// Ordinal PM2.5 health category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AirQualityCategory {
    Good,
    Moderate,
    Unhealthy,
    VeryUnhealthy,
    Hazardous,
}

impl AirQualityCategory {
    pub const ALL: [AirQualityCategory; 5] = [
        AirQualityCategory::Good,
        AirQualityCategory::Moderate,
        AirQualityCategory::Unhealthy,
        AirQualityCategory::VeryUnhealthy,
        AirQualityCategory::Hazardous,
    ];

    /// Bucket a daily mean into right-closed bins `(0,15] (15,35] (35,55] (55,150] (150,inf)`.
    ///
    /// Values at or below zero fall outside the first bin and stay uncategorised,
    /// as do missing and non-finite values.
    pub fn classify(value: Option<f64>) -> Option<Self> {
        let value = value.filter(|v| !v.is_nan())?;
        if value <= CATEGORY_BREAKPOINTS[0] {
            return None;
        }
        Self::ALL
            .iter()
            .zip(CATEGORY_BREAKPOINTS.windows(2))
            .find(|(_, bounds)| value <= bounds[1])
            .map(|(category, _)| *category)
    }

    /// Verdict cascade over an overall mean, left-closed:
    /// `< 15`, `< 35`, `< 55`, `< 150`, else hazardous.
    pub fn from_overall_mean(mean: f64) -> Self {
        if mean < CATEGORY_BREAKPOINTS[1] {
            AirQualityCategory::Good
        } else if mean < CATEGORY_BREAKPOINTS[2] {
            AirQualityCategory::Moderate
        } else if mean < CATEGORY_BREAKPOINTS[3] {
            AirQualityCategory::Unhealthy
        } else if mean < CATEGORY_BREAKPOINTS[4] {
            AirQualityCategory::VeryUnhealthy
        } else {
            AirQualityCategory::Hazardous
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AirQualityCategory::Good => "Good",
            AirQualityCategory::Moderate => "Moderate",
            AirQualityCategory::Unhealthy => "Unhealthy",
            AirQualityCategory::VeryUnhealthy => "Very Unhealthy",
            AirQualityCategory::Hazardous => "Hazardous",
        }
    }

    /// Advice attached to the automatic air-quality conclusion
    pub fn advice(&self) -> &'static str {
        match self {
            AirQualityCategory::Good => {
                "Air quality is good. PM2.5 stays below the WHO threshold."
            }
            AirQualityCategory::Moderate => {
                "Air quality is moderate. Still within limits, but the increase deserves attention."
            }
            AirQualityCategory::Unhealthy => {
                "Air quality is unhealthy. Watch for health effects, especially in sensitive groups."
            }
            AirQualityCategory::VeryUnhealthy => {
                "Air quality is very unhealthy. Outdoor activity should be reduced."
            }
            AirQualityCategory::Hazardous => {
                "Air quality is hazardous. Avoid outdoor activity and follow health warnings."
            }
        }
    }
}

impl fmt::Display for AirQualityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}
