use crate::error::{DashboardError, Result};
use crate::models::{MetVariable, Pollutant, Reading};
use crate::utils::constants::*;
use chrono::{NaiveDate, NaiveDateTime};
use memmap2::Mmap;
use std::borrow::Cow;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, warn};

/// Column positions resolved from the header row
#[derive(Debug, Default)]
struct ColumnMap {
    datetime: Option<usize>,
    year: Option<usize>,
    month: Option<usize>,
    day: Option<usize>,
    hour: Option<usize>,
    station: usize,
    pollutants: [Option<usize>; 6],
    met: [Option<usize>; 4],
    wind_direction: Option<usize>,
    wind_speed: Option<usize>,
}

impl ColumnMap {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self> {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);

        let station = find(COL_STATION)
            .ok_or_else(|| DashboardError::MissingColumn(COL_STATION.to_string()))?;

        let map = Self {
            datetime: find(COL_DATETIME),
            year: find(COL_YEAR),
            month: find(COL_MONTH),
            day: find(COL_DAY),
            hour: find(COL_HOUR),
            station,
            pollutants: Pollutant::ALL.map(|p| find(p.column_name())),
            met: MetVariable::ALL.map(|m| find(m.column_name())),
            wind_direction: find(COL_WIND_DIRECTION),
            wind_speed: find(COL_WIND_SPEED),
        };

        let has_parts =
            map.year.is_some() && map.month.is_some() && map.day.is_some() && map.hour.is_some();
        if map.datetime.is_none() && !has_parts {
            return Err(DashboardError::MissingColumn(format!(
                "{} (or {}/{}/{}/{})",
                COL_DATETIME, COL_YEAR, COL_MONTH, COL_DAY, COL_HOUR
            )));
        }

        Ok(map)
    }
}

/// Reads the flat hourly air-quality table.
///
/// Two layouts are accepted: a cleaned table with a `datetime` column, and the
/// raw per-station layout where the timestamp is split over `year`, `month`,
/// `day` and `hour`. Pollutant and meteorology columns are matched by name and
/// may be absent or hold `NA`.
pub struct AirQualityReader {
    use_mmap: bool,
}

impl AirQualityReader {
    pub fn new() -> Self {
        Self { use_mmap: false }
    }

    pub fn with_mmap(use_mmap: bool) -> Self {
        Self { use_mmap }
    }

    pub fn read_csv(&self, path: &Path) -> Result<Vec<Reading>> {
        let file = File::open(path)?;
        let size = file.metadata()?.len();
        let source = path.display().to_string();

        if self.use_mmap || size >= MMAP_THRESHOLD_BYTES {
            debug!("Memory-mapping {} ({} bytes)", source, size);
            let mmap = unsafe { Mmap::map(&file)? };
            self.read_bytes(&mmap, &source)
        } else {
            let mut bytes = Vec::with_capacity(size as usize);
            BufReader::with_capacity(DEFAULT_BUFFER_SIZE, file).read_to_end(&mut bytes)?;
            self.read_bytes(&bytes, &source)
        }
    }

    /// Parse an in-memory CSV, decoding Windows-1252 when the bytes are not UTF-8
    pub fn read_bytes(&self, bytes: &[u8], source: &str) -> Result<Vec<Reading>> {
        let text = decode_text(bytes, source);
        self.read_from(text.as_bytes(), source)
    }

    pub fn read_from<R: Read>(&self, input: R, source: &str) -> Result<Vec<Reading>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .trim(csv::Trim::All)
            .from_reader(input);

        let columns = ColumnMap::from_headers(reader.headers()?)?;
        let mut readings = Vec::new();
        let mut skipped = 0usize;

        for (index, result) in reader.records().enumerate() {
            let record = result?;
            let row = record
                .position()
                .map(|p| p.line())
                .unwrap_or(index as u64 + 2);

            let reading = parse_record(&record, &columns, row)?;
            if let Err(e) = reading.validate_reading() {
                if skipped == 0 {
                    warn!("{}: skipping invalid row {}: {}", source, row, e);
                }
                skipped += 1;
                continue;
            }
            readings.push(reading);
        }

        if skipped > 0 {
            warn!("{}: skipped {} invalid rows", source, skipped);
        }
        debug!("{}: read {} readings", source, readings.len());

        Ok(readings)
    }
}

impl Default for AirQualityReader {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_text<'a>(bytes: &'a [u8], source: &str) -> Cow<'a, str> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => {
            warn!("{} is not valid UTF-8, decoding as Windows-1252", source);
            encoding_rs::WINDOWS_1252.decode_without_bom_handling(bytes).0
        }
    }
}

fn parse_record(record: &csv::StringRecord, columns: &ColumnMap, row: u64) -> Result<Reading> {
    let field = |idx: usize| record.get(idx).unwrap_or("");

    let datetime = match columns.datetime {
        Some(idx) => parse_datetime(field(idx)).ok_or_else(|| DashboardError::InvalidRow {
            row,
            message: format!("invalid datetime '{}'", field(idx)),
        })?,
        None => datetime_from_parts(record, columns, row)?,
    };

    let station = field(columns.station);
    if station.is_empty() {
        return Err(DashboardError::InvalidRow {
            row,
            message: "empty station".to_string(),
        });
    }

    let mut builder = Reading::builder(datetime, station);

    for (pollutant, idx) in Pollutant::ALL.iter().zip(columns.pollutants.iter()) {
        if let Some(value) = optional_number(*idx, record, row)? {
            builder = builder.pollutant(*pollutant, value);
        }
    }

    for (variable, idx) in MetVariable::ALL.iter().zip(columns.met.iter()) {
        if let Some(value) = optional_number(*idx, record, row)? {
            builder = builder.met(*variable, value);
        }
    }

    let wind_direction = columns
        .wind_direction
        .map(field)
        .filter(|s| !MISSING_TOKENS.contains(s))
        .map(str::to_string);
    let wind_speed = optional_number(columns.wind_speed, record, row)?;

    Ok(builder.wind(wind_direction, wind_speed).build())
}

fn optional_number(
    idx: Option<usize>,
    record: &csv::StringRecord,
    row: u64,
) -> Result<Option<f64>> {
    let Some(idx) = idx else {
        return Ok(None);
    };
    let raw = record.get(idx).unwrap_or("");
    if MISSING_TOKENS.contains(&raw) {
        return Ok(None);
    }
    raw.parse::<f64>()
        .map(Some)
        .map_err(|_| DashboardError::InvalidRow {
            row,
            message: format!("invalid number '{}'", raw),
        })
}

pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn datetime_from_parts(
    record: &csv::StringRecord,
    columns: &ColumnMap,
    row: u64,
) -> Result<NaiveDateTime> {
    let part = |idx: Option<usize>, name: &str| -> Result<u32> {
        let raw = idx.and_then(|i| record.get(i)).unwrap_or("");
        raw.parse::<u32>().map_err(|_| DashboardError::InvalidRow {
            row,
            message: format!("invalid {} '{}'", name, raw),
        })
    };

    let year = part(columns.year, COL_YEAR)?;
    let month = part(columns.month, COL_MONTH)?;
    let day = part(columns.day, COL_DAY)?;
    let hour = part(columns.hour, COL_HOUR)?;

    NaiveDate::from_ymd_opt(year as i32, month, day)
        .and_then(|d| d.and_hms_opt(hour, 0, 0))
        .ok_or_else(|| DashboardError::InvalidRow {
            row,
            message: format!("invalid timestamp {}-{}-{} {}:00", year, month, day, hour),
        })
}
