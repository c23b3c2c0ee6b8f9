use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Pollutant columns carried by every reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Pollutant {
    #[serde(rename = "PM2.5")]
    Pm25,
    #[serde(rename = "PM10")]
    Pm10,
    #[serde(rename = "SO2")]
    So2,
    #[serde(rename = "NO2")]
    No2,
    #[serde(rename = "CO")]
    Co,
    #[serde(rename = "O3")]
    O3,
}

impl Pollutant {
    pub const ALL: [Pollutant; 6] = [
        Pollutant::Pm25,
        Pollutant::Pm10,
        Pollutant::So2,
        Pollutant::No2,
        Pollutant::Co,
        Pollutant::O3,
    ];

    /// Choices offered for yearly trends and hourly/weekday patterns
    pub const TREND: [Pollutant; 3] = [Pollutant::Pm25, Pollutant::Pm10, Pollutant::No2];

    pub fn column_name(&self) -> &'static str {
        match self {
            Pollutant::Pm25 => "PM2.5",
            Pollutant::Pm10 => "PM10",
            Pollutant::So2 => "SO2",
            Pollutant::No2 => "NO2",
            Pollutant::Co => "CO",
            Pollutant::O3 => "O3",
        }
    }

    /// Key used in configuration files and environment variables
    pub fn config_key(&self) -> &'static str {
        match self {
            Pollutant::Pm25 => "pm25",
            Pollutant::Pm10 => "pm10",
            Pollutant::So2 => "so2",
            Pollutant::No2 => "no2",
            Pollutant::Co => "co",
            Pollutant::O3 => "o3",
        }
    }

    /// Unit of the published WHO reference value
    pub fn threshold_unit(&self) -> &'static str {
        match self {
            Pollutant::Co => "mg/m³",
            _ => "µg/m³",
        }
    }
}

impl fmt::Display for Pollutant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.column_name())
    }
}

impl FromStr for Pollutant {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_uppercase().replace(['.', '_'], "").as_str() {
            "PM25" => Ok(Pollutant::Pm25),
            "PM10" => Ok(Pollutant::Pm10),
            "SO2" => Ok(Pollutant::So2),
            "NO2" => Ok(Pollutant::No2),
            "CO" => Ok(Pollutant::Co),
            "O3" => Ok(Pollutant::O3),
            _ => Err(format!(
                "unknown pollutant '{}' (expected one of PM2.5, PM10, SO2, NO2, CO, O3)",
                s
            )),
        }
    }
}

/// Meteorological columns carried by every reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MetVariable {
    #[serde(rename = "TEMP")]
    Temp,
    #[serde(rename = "PRES")]
    Pres,
    #[serde(rename = "DEWP")]
    Dewp,
    #[serde(rename = "RAIN")]
    Rain,
}

impl MetVariable {
    pub const ALL: [MetVariable; 4] = [
        MetVariable::Temp,
        MetVariable::Pres,
        MetVariable::Dewp,
        MetVariable::Rain,
    ];

    pub fn column_name(&self) -> &'static str {
        match self {
            MetVariable::Temp => "TEMP",
            MetVariable::Pres => "PRES",
            MetVariable::Dewp => "DEWP",
            MetVariable::Rain => "RAIN",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            MetVariable::Temp => "Temperature",
            MetVariable::Pres => "Pressure",
            MetVariable::Dewp => "Dew point",
            MetVariable::Rain => "Rainfall",
        }
    }
}

impl fmt::Display for MetVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.column_name())
    }
}

impl FromStr for MetVariable {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "TEMP" => Ok(MetVariable::Temp),
            "PRES" => Ok(MetVariable::Pres),
            "DEWP" => Ok(MetVariable::Dewp),
            "RAIN" => Ok(MetVariable::Rain),
            _ => Err(format!(
                "unknown meteorological variable '{}' (expected one of TEMP, PRES, DEWP, RAIN)",
                s
            )),
        }
    }
}

/// Any numeric column that can take part in a correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Variable {
    Met(MetVariable),
    Pollutant(Pollutant),
}

impl Variable {
    /// Correlation columns: the four met variables followed by the trend pollutants
    pub fn correlation_set() -> Vec<Variable> {
        MetVariable::ALL
            .iter()
            .map(|m| Variable::Met(*m))
            .chain(Pollutant::TREND.iter().map(|p| Variable::Pollutant(*p)))
            .collect()
    }

    pub fn column_name(&self) -> &'static str {
        match self {
            Variable::Met(m) => m.column_name(),
            Variable::Pollutant(p) => p.column_name(),
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.column_name())
    }
}
