pub mod aggregations;
pub mod filter;
pub mod quality;

pub use aggregations::{
    correlation_matrix, daily_means, hourly_means, mean, pearson, rain_comparison, scatter_points,
    weekday_means, yearly_station_means, CorrelationMatrix, DailyMean, HourlyMean,
    MeanAccumulator, PollutantMeans, RainComparisonRow, ScatterSeries, WeekdayMean,
    YearlyStationMean,
};
pub use quality::{ColumnCompleteness, DataQualityChecker, DataQualityReport, StationCoverage};
