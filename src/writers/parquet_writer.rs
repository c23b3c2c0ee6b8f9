use crate::analyzers::AdvancedReport;
use crate::error::{DashboardError, Result};
use crate::models::{AirQualityCategory, Pollutant};
use crate::processors::PollutantMeans;
use crate::utils::constants::{
    COMPRESSION_GZIP, COMPRESSION_LZ4, COMPRESSION_NONE, COMPRESSION_SNAPPY, COMPRESSION_ZSTD,
    DEFAULT_ROW_GROUP_SIZE, UNIX_EPOCH_DAYS_FROM_CE,
};
use arrow::array::*;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{Datelike, NaiveDate};
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel};
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// One exported row: a station's daily pollutant means and PM2.5 category.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyRecord {
    pub station: String,
    pub date: NaiveDate,
    pub means: PollutantMeans,
    pub category: Option<AirQualityCategory>,
}

impl DailyRecord {
    pub fn from_report(report: &AdvancedReport) -> Vec<DailyRecord> {
        report
            .daily
            .iter()
            .zip(&report.classified)
            .map(|(day, class)| DailyRecord {
                station: report.station.clone(),
                date: day.date,
                means: day.means.clone(),
                category: class.category,
            })
            .collect()
    }

    pub fn get(&self, pollutant: Pollutant) -> Option<f64> {
        self.means.get(&pollutant).copied().flatten()
    }
}

pub struct ParquetWriter {
    compression: Compression,
    row_group_size: usize,
}

impl ParquetWriter {
    pub fn new() -> Self {
        Self {
            compression: Compression::SNAPPY,
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
        }
    }

    pub fn with_compression(mut self, compression: &str) -> Result<Self> {
        self.compression = match compression.to_lowercase().as_str() {
            COMPRESSION_SNAPPY => Compression::SNAPPY,
            COMPRESSION_GZIP => Compression::GZIP(GzipLevel::default()),
            COMPRESSION_LZ4 => Compression::LZ4,
            COMPRESSION_ZSTD => Compression::ZSTD(parquet::basic::ZstdLevel::default()),
            COMPRESSION_NONE => Compression::UNCOMPRESSED,
            _ => {
                return Err(DashboardError::Config(format!(
                    "Unsupported compression: {}",
                    compression
                )))
            }
        };
        Ok(self)
    }

    /// Write daily means and categories to a Parquet file
    pub fn write_daily_records(&self, records: &[DailyRecord], path: &Path) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let schema = Self::daily_schema();
        let batch = Self::daily_to_batch(records, schema.clone())?;
        self.write_batches(schema, &[batch], path)?;

        debug!("Wrote {} daily rows to {}", records.len(), path.display());
        Ok(())
    }

    /// Write the yearly WHO recap of an advanced report
    pub fn write_yearly_recap(&self, report: &AdvancedReport, path: &Path) -> Result<()> {
        if report.yearly.is_empty() {
            return Ok(());
        }

        let schema = Self::yearly_schema();
        let batch = Self::yearly_to_batch(report, schema.clone())?;
        self.write_batches(schema, &[batch], path)?;

        debug!("Wrote {} yearly rows to {}", report.yearly.len(), path.display());
        Ok(())
    }

    fn write_batches(
        &self,
        schema: Arc<Schema>,
        batches: &[RecordBatch],
        path: &Path,
    ) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let file = File::create(path)?;
        let props = WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .build();

        let mut writer = ArrowWriter::try_new(file, schema, Some(props))?;
        for batch in batches {
            writer.write(batch)?;
        }
        writer.close()?;
        Ok(())
    }

    fn daily_schema() -> Arc<Schema> {
        let mut fields = vec![
            Field::new("station", DataType::Utf8, false),
            Field::new("date", DataType::Date32, false),
        ];
        for pollutant in Pollutant::ALL {
            fields.push(Field::new(pollutant.column_name(), DataType::Float64, true));
        }
        fields.push(Field::new("category", DataType::Utf8, true));

        Arc::new(Schema::new(fields))
    }

    fn daily_to_batch(records: &[DailyRecord], schema: Arc<Schema>) -> Result<RecordBatch> {
        let stations: Vec<&str> = records.iter().map(|r| r.station.as_str()).collect();
        let dates: Vec<i32> = records.iter().map(|r| days_since_epoch(r.date)).collect();
        let categories: Vec<Option<&str>> = records
            .iter()
            .map(|r| r.category.map(|c| c.label()))
            .collect();

        let mut columns: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from(stations)),
            Arc::new(Date32Array::from(dates)),
        ];
        for pollutant in Pollutant::ALL {
            let values: Vec<Option<f64>> = records.iter().map(|r| r.get(pollutant)).collect();
            columns.push(Arc::new(Float64Array::from(values)));
        }
        columns.push(Arc::new(StringArray::from(categories)));

        Ok(RecordBatch::try_new(schema, columns)?)
    }

    fn yearly_schema() -> Arc<Schema> {
        let mut fields = vec![
            Field::new("station", DataType::Utf8, false),
            Field::new("year", DataType::Int32, false),
            Field::new("total_days", DataType::UInt32, false),
        ];
        for pollutant in Pollutant::ALL {
            let name = pollutant.column_name();
            fields.push(Field::new(format!("mean_{}", name), DataType::Float64, true));
            fields.push(Field::new(format!("exceed_days_{}", name), DataType::UInt32, false));
            fields.push(Field::new(format!("exceed_pct_{}", name), DataType::Float64, false));
        }

        Arc::new(Schema::new(fields))
    }

    fn yearly_to_batch(report: &AdvancedReport, schema: Arc<Schema>) -> Result<RecordBatch> {
        let rows = &report.yearly;
        let mut columns: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from(vec![report.station.as_str(); rows.len()])),
            Arc::new(Int32Array::from(rows.iter().map(|r| r.year).collect::<Vec<_>>())),
            Arc::new(UInt32Array::from(
                rows.iter().map(|r| r.total_days as u32).collect::<Vec<_>>(),
            )),
        ];

        for pollutant in Pollutant::ALL {
            let means: Vec<Option<f64>> = rows.iter().map(|r| r.mean(pollutant)).collect();
            let days: Vec<u32> = rows
                .iter()
                .map(|r| r.exceedance(pollutant).map_or(0, |e| e.days as u32))
                .collect();
            let pct: Vec<f64> = rows
                .iter()
                .map(|r| r.exceedance(pollutant).map_or(0.0, |e| e.percentage))
                .collect();
            columns.push(Arc::new(Float64Array::from(means)));
            columns.push(Arc::new(UInt32Array::from(days)));
            columns.push(Arc::new(Float64Array::from(pct)));
        }

        Ok(RecordBatch::try_new(schema, columns)?)
    }

    /// Read up to `limit` daily rows back from an exported file
    pub fn read_daily_records(&self, path: &Path, limit: usize) -> Result<Vec<DailyRecord>> {
        use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

        let file = File::open(path)?;
        let parquet_reader = ParquetRecordBatchReaderBuilder::try_new(file)?
            .with_batch_size(limit.clamp(1, 8192))
            .build()?;

        let mut records = Vec::new();
        for batch_result in parquet_reader {
            let batch = batch_result?;

            let stations = column::<StringArray>(&batch, "station")?;
            let dates = column::<Date32Array>(&batch, "date")?;
            let categories = column::<StringArray>(&batch, "category")?;
            let mut pollutant_columns = Vec::with_capacity(Pollutant::ALL.len());
            for pollutant in Pollutant::ALL {
                let values = column::<Float64Array>(&batch, pollutant.column_name())?;
                pollutant_columns.push((pollutant, values));
            }

            for i in 0..batch.num_rows() {
                if records.len() >= limit {
                    return Ok(records);
                }

                let date =
                    NaiveDate::from_num_days_from_ce_opt(dates.value(i) + UNIX_EPOCH_DAYS_FROM_CE)
                        .ok_or_else(|| {
                            DashboardError::InvalidFormat(format!("invalid date at row {}", i))
                        })?;
                let means = pollutant_columns
                    .iter()
                    .map(|(p, values)| (*p, (!values.is_null(i)).then(|| values.value(i))))
                    .collect();
                let category = if categories.is_null(i) {
                    None
                } else {
                    let label = categories.value(i);
                    let found = AirQualityCategory::ALL.into_iter().find(|c| c.label() == label);
                    Some(found.ok_or_else(|| {
                        DashboardError::InvalidFormat(format!("unknown category '{}'", label))
                    })?)
                };

                records.push(DailyRecord {
                    station: stations.value(i).to_string(),
                    date,
                    means,
                    category,
                });
            }
        }

        Ok(records)
    }

    /// Get file statistics
    pub fn get_file_info(&self, path: &Path) -> Result<ParquetFileInfo> {
        use parquet::file::reader::{FileReader, SerializedFileReader};

        let file = File::open(path)?;
        let reader = SerializedFileReader::new(file)?;
        let metadata = reader.metadata();

        let row_groups = metadata.num_row_groups();
        let total_rows = metadata.file_metadata().num_rows();
        let file_size = std::fs::metadata(path)?.len();

        let row_group_sizes = (0..row_groups)
            .map(|i| metadata.row_group(i).num_rows())
            .collect();

        Ok(ParquetFileInfo {
            total_rows,
            row_groups: row_groups as i32,
            row_group_sizes,
            file_size,
            compression: self.compression,
        })
    }
}

impl Default for ParquetWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn days_since_epoch(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<T>())
        .ok_or_else(|| DashboardError::MissingColumn(name.to_string()))
}

#[derive(Debug)]
pub struct ParquetFileInfo {
    pub total_rows: i64,
    pub row_groups: i32,
    pub row_group_sizes: Vec<i64>,
    pub file_size: u64,
    pub compression: Compression,
}

impl ParquetFileInfo {
    pub fn summary(&self) -> String {
        format!(
            "Parquet File Summary:\n\
            - Total rows: {}\n\
            - Row groups: {}\n\
            - File size: {:.2} MB\n\
            - Compression: {:?}\n\
            - Avg rows per group: {:.0}",
            self.total_rows,
            self.row_groups,
            self.file_size as f64 / 1_048_576.0,
            self.compression,
            self.total_rows as f64 / self.row_groups.max(1) as f64
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::AdvancedAnalyzer;
    use crate::models::{AirQualityDataset, Reading};
    use tempfile::{NamedTempFile, TempDir};

    fn report() -> AdvancedReport {
        let mut readings = Vec::new();
        for (date, pm25) in [
            ((2016, 12, 30), 10.0),
            ((2016, 12, 31), 40.0),
            ((2017, 1, 1), 160.0),
        ] {
            let dt = NaiveDate::from_ymd_opt(date.0, date.1, date.2)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap();
            let mut r = Reading::new(dt, "Guanyuan");
            r.pm25 = Some(pm25);
            readings.push(r);
        }
        let data = AirQualityDataset::new(readings);
        AdvancedAnalyzer::default()
            .analyze(&data, None, None, None)
            .unwrap()
    }

    #[test]
    fn test_write_empty_records() {
        let writer = ParquetWriter::new();
        let temp_file = NamedTempFile::new().unwrap();

        let result = writer.write_daily_records(&[], temp_file.path());
        assert!(result.is_ok());
    }

    #[test]
    fn test_daily_export_reads_back() -> Result<()> {
        let writer = ParquetWriter::new();
        let temp_file = NamedTempFile::new()?;
        let records = DailyRecord::from_report(&report());
        assert_eq!(records.len(), 3);

        writer.write_daily_records(&records, temp_file.path())?;
        let back = writer.read_daily_records(temp_file.path(), 10)?;

        assert_eq!(back, records);
        assert_eq!(back[0].category, Some(AirQualityCategory::Good));
        assert_eq!(back[2].category, Some(AirQualityCategory::Hazardous));
        assert_eq!(back[2].date, NaiveDate::from_ymd_opt(2017, 1, 1).unwrap());
        assert_eq!(back[0].get(Pollutant::O3), None);

        let info = writer.get_file_info(temp_file.path())?;
        assert_eq!(info.total_rows, 3);
        Ok(())
    }

    #[test]
    fn test_yearly_recap_export() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("nested").join("recap.parquet");
        let report = report();

        ParquetWriter::new().write_yearly_recap(&report, &path)?;
        let info = ParquetWriter::new().get_file_info(&path)?;
        assert_eq!(info.total_rows, 2);
        assert!(info.summary().contains("Total rows: 2"));
        Ok(())
    }

    #[test]
    fn test_different_compressions() -> Result<()> {
        let records = DailyRecord::from_report(&report());
        let compressions = ["snappy", "gzip", "lz4", "zstd", "none"];

        for compression in &compressions {
            let writer = ParquetWriter::new().with_compression(compression)?;
            let temp_file = NamedTempFile::new()?;

            let result = writer.write_daily_records(&records, temp_file.path());
            assert!(result.is_ok(), "Failed with compression: {}", compression);
        }

        assert!(ParquetWriter::new().with_compression("brotli9").is_err());
        Ok(())
    }
}
