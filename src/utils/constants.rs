use chrono::Weekday;

/// Category breakpoints (µg/m³), right-closed bins starting above zero
pub const CATEGORY_BREAKPOINTS: [f64; 6] = [0.0, 15.0, 35.0, 55.0, 150.0, f64::INFINITY];

/// WHO reference values per pollutant
pub const WHO_PM25: f64 = 15.0;
pub const WHO_PM10: f64 = 45.0;
pub const WHO_SO2: f64 = 20.0;
pub const WHO_NO2: f64 = 25.0;
pub const WHO_CO: f64 = 4.0;
pub const WHO_O3: f64 = 100.0;

/// Trailing window for frequency and magnitude
pub const DEFAULT_RFM_WINDOW_DAYS: i64 = 30;
pub const MAX_RFM_WINDOW_DAYS: i64 = 36_500;

/// Canonical week ordering for weekday averages
pub const WEEKDAY_ORDER: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

pub const HOURS_PER_DAY: u32 = 24;

/// Column names in the input table
pub const COL_DATETIME: &str = "datetime";
pub const COL_STATION: &str = "station";
pub const COL_YEAR: &str = "year";
pub const COL_MONTH: &str = "month";
pub const COL_DAY: &str = "day";
pub const COL_HOUR: &str = "hour";
pub const COL_WIND_DIRECTION: &str = "wd";
pub const COL_WIND_SPEED: &str = "WSPM";

/// Tokens treated as a missing numeric value
pub const MISSING_TOKENS: [&str; 5] = ["", "NA", "NaN", "nan", "null"];

/// Accepted timestamp layouts for the datetime column
pub const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M",
];

/// Processing defaults
pub const DEFAULT_BUFFER_SIZE: usize = 8192 * 16; // 128KB
pub const DEFAULT_ROW_GROUP_SIZE: usize = 10000;
pub const MMAP_THRESHOLD_BYTES: u64 = 64 * 1024 * 1024;

/// Output defaults
pub const DEFAULT_OUTPUT_DIR: &str = "output";
pub const DEFAULT_CHART_WIDTH: u32 = 1024;
pub const DEFAULT_CHART_HEIGHT: u32 = 640;
pub const CONFIG_FILE_NAME: &str = "aq-dashboard.toml";
pub const ENV_PREFIX: &str = "AQ_DASHBOARD";

/// Parquet compression options
pub const COMPRESSION_SNAPPY: &str = "snappy";
pub const COMPRESSION_GZIP: &str = "gzip";
pub const COMPRESSION_LZ4: &str = "lz4";
pub const COMPRESSION_ZSTD: &str = "zstd";
pub const COMPRESSION_NONE: &str = "none";

/// Days from 0001-01-01 to 1970-01-01, for Arrow Date32 columns
pub const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;
