pub mod chart_writer;
pub mod parquet_writer;
pub mod report_writer;

pub use chart_writer::ChartWriter;
pub use parquet_writer::{DailyRecord, ParquetFileInfo, ParquetWriter};
pub use report_writer::{ReportFormat, ReportWriter};
