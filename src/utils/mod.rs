pub mod constants;
pub mod filename;
pub mod logging;
pub mod progress;

pub use constants::*;
pub use filename::{chart_path, describe_range, generate_default_export_filename, slugify};
pub use logging::init_logging;
pub use progress::ProgressReporter;
