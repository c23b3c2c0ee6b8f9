pub mod air_quality_reader;
pub mod dataset_loader;

pub use air_quality_reader::{parse_datetime, AirQualityReader};
pub use dataset_loader::{load_dataset_async, DatasetLoader};
