use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::Result;
use crate::models::{MetVariable, Pollutant, Variable};

/// One hourly measurement from one monitoring station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Reading {
    pub datetime: NaiveDateTime,

    #[validate(length(min = 1))]
    pub station: String,

    // Pollutants (µg/m³)
    pub pm25: Option<f64>,
    pub pm10: Option<f64>,
    pub so2: Option<f64>,
    pub no2: Option<f64>,
    pub co: Option<f64>,
    pub o3: Option<f64>,

    // Meteorology
    pub temp: Option<f64>,
    pub pres: Option<f64>,
    pub dewp: Option<f64>,

    #[validate(range(min = 0.0))]
    pub rain: Option<f64>,

    pub wind_direction: Option<String>,

    #[validate(range(min = 0.0))]
    pub wind_speed: Option<f64>,
}

impl Reading {
    pub fn new(datetime: NaiveDateTime, station: impl Into<String>) -> Self {
        Self {
            datetime,
            station: station.into(),
            pm25: None,
            pm10: None,
            so2: None,
            no2: None,
            co: None,
            o3: None,
            temp: None,
            pres: None,
            dewp: None,
            rain: None,
            wind_direction: None,
            wind_speed: None,
        }
    }

    pub fn builder(datetime: NaiveDateTime, station: impl Into<String>) -> ReadingBuilder {
        ReadingBuilder {
            reading: Reading::new(datetime, station),
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.datetime.date()
    }

    pub fn hour(&self) -> u32 {
        self.datetime.hour()
    }

    pub fn weekday(&self) -> Weekday {
        self.datetime.weekday()
    }

    pub fn year(&self) -> i32 {
        self.datetime.year()
    }

    pub fn pollutant(&self, pollutant: Pollutant) -> Option<f64> {
        let value = match pollutant {
            Pollutant::Pm25 => self.pm25,
            Pollutant::Pm10 => self.pm10,
            Pollutant::So2 => self.so2,
            Pollutant::No2 => self.no2,
            Pollutant::Co => self.co,
            Pollutant::O3 => self.o3,
        };
        value.filter(|v| v.is_finite())
    }

    pub fn met(&self, variable: MetVariable) -> Option<f64> {
        let value = match variable {
            MetVariable::Temp => self.temp,
            MetVariable::Pres => self.pres,
            MetVariable::Dewp => self.dewp,
            MetVariable::Rain => self.rain,
        };
        value.filter(|v| v.is_finite())
    }

    pub fn value(&self, variable: Variable) -> Option<f64> {
        match variable {
            Variable::Met(m) => self.met(m),
            Variable::Pollutant(p) => self.pollutant(p),
        }
    }

    /// Rain flag used by the rain comparison; a missing reading counts as dry
    pub fn is_raining(&self) -> bool {
        self.met(MetVariable::Rain).is_some_and(|r| r > 0.0)
    }

    pub fn validate_reading(&self) -> Result<()> {
        self.validate()?;
        Ok(())
    }
}

pub struct ReadingBuilder {
    reading: Reading,
}

impl ReadingBuilder {
    pub fn pollutant(mut self, pollutant: Pollutant, value: f64) -> Self {
        let slot = match pollutant {
            Pollutant::Pm25 => &mut self.reading.pm25,
            Pollutant::Pm10 => &mut self.reading.pm10,
            Pollutant::So2 => &mut self.reading.so2,
            Pollutant::No2 => &mut self.reading.no2,
            Pollutant::Co => &mut self.reading.co,
            Pollutant::O3 => &mut self.reading.o3,
        };
        *slot = Some(value);
        self
    }

    pub fn met(mut self, variable: MetVariable, value: f64) -> Self {
        let slot = match variable {
            MetVariable::Temp => &mut self.reading.temp,
            MetVariable::Pres => &mut self.reading.pres,
            MetVariable::Dewp => &mut self.reading.dewp,
            MetVariable::Rain => &mut self.reading.rain,
        };
        *slot = Some(value);
        self
    }

    pub fn pm25(self, value: f64) -> Self {
        self.pollutant(Pollutant::Pm25, value)
    }

    pub fn rain(self, value: f64) -> Self {
        self.met(MetVariable::Rain, value)
    }

    pub fn wind(mut self, direction: Option<String>, speed: Option<f64>) -> Self {
        self.reading.wind_direction = direction;
        self.reading.wind_speed = speed;
        self
    }

    pub fn build(self) -> Reading {
        self.reading
    }
}
