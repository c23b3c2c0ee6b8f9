pub mod category;
pub mod dataset;
pub mod pollutant;
pub mod reading;
pub mod selection;

pub use category::AirQualityCategory;
pub use dataset::AirQualityDataset;
pub use pollutant::{MetVariable, Pollutant, Variable};
pub use reading::{Reading, ReadingBuilder};
pub use selection::{FilterSelection, RainState};
