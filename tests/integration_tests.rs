use aq_dashboard::analyzers::{AdvancedAnalyzer, ExplorationAnalyzer, InsightTopic};
use aq_dashboard::config::DashboardConfig;
use aq_dashboard::models::{AirQualityCategory, FilterSelection, MetVariable, Pollutant, RainState};
use aq_dashboard::readers::{load_dataset_async, DatasetLoader};
use aq_dashboard::writers::{ChartWriter, DailyRecord, ParquetWriter, ReportFormat, ReportWriter};
use aq_dashboard::{DashboardError, Result};
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;
use zip::write::FileOptions;
use zip::ZipWriter;

const HEADER: &str =
    "No,year,month,day,hour,PM2.5,PM10,SO2,NO2,CO,O3,TEMP,PRES,DEWP,RAIN,wd,WSPM,station";

/// Raw PRSA-style station file: `days` days from 2016-12-30, four readings a day
fn station_csv(station: &str, base_pm25: f64, days: u32) -> String {
    let mut csv = format!("{}\n", HEADER);
    let start = NaiveDate::from_ymd_opt(2016, 12, 30).unwrap();
    let mut no = 1;
    for offset in 0..days {
        let date = start + chrono::Duration::days(offset as i64);
        for hour in [0u32, 6, 12, 18] {
            let pm25 = base_pm25 + offset as f64 + hour as f64 / 6.0;
            let rain = if hour == 18 { "0.4" } else { "0" };
            let no2 = if hour == 12 { "NA".to_string() } else { format!("{}", 30 + hour) };
            csv.push_str(&format!(
                "{},{},{},{},{},{:.1},{:.1},6,{},700,60,{:.1},1015.2,-9.5,{},NW,2.1,{}\n",
                no,
                date.format("%Y"),
                date.format("%-m"),
                date.format("%-d"),
                hour,
                pm25,
                pm25 * 1.4,
                no2,
                hour as f64 - 3.0,
                rain,
                station
            ));
            no += 1;
        }
    }
    csv
}

fn write_directory(dir: &Path) -> Result<()> {
    for (station, base) in [("Aotizhongxin", 20.0), ("Huairou", 8.0)] {
        let mut file = File::create(dir.join(format!("PRSA_Data_{}.csv", station)))?;
        file.write_all(station_csv(station, base, 5).as_bytes())?;
    }
    Ok(())
}

#[test]
fn test_exploration_end_to_end() -> Result<()> {
    let dir = TempDir::new()?;
    write_directory(dir.path())?;

    let dataset = DatasetLoader::new(2).load(dir.path())?;
    assert_eq!(dataset.stations(), vec!["Aotizhongxin", "Huairou"]);
    assert_eq!(dataset.len(), 40);

    let selection = FilterSelection::new()
        .with_date_range(NaiveDate::from_ymd_opt(2016, 12, 31), NaiveDate::from_ymd_opt(2017, 1, 2))
        .with_met_variables(vec![MetVariable::Temp, MetVariable::Rain])
        .with_rain_state(RainState::Rainy);
    let report = ExplorationAnalyzer::new(2).analyze(&dataset, &selection, &InsightTopic::ALL)?;

    assert_eq!(report.row_count, 24);
    let years: Vec<(i32, String)> =
        report.yearly.iter().map(|y| (y.year, y.station.clone())).collect();
    assert_eq!(
        years,
        vec![
            (2016, "Aotizhongxin".to_string()),
            (2016, "Huairou".to_string()),
            (2017, "Aotizhongxin".to_string()),
            (2017, "Huairou".to_string()),
        ]
    );
    assert_eq!(report.hourly.len(), 24);
    assert!(report.hourly[3].mean.is_none());
    assert_eq!(report.scatter.len(), 2);
    assert_eq!(report.rain.label, "Rainy days");
    assert_eq!(report.rain.rows.len(), 1);
    assert_eq!(report.rain.rows[0].hours, 6);

    let no2 = report.quality.column("NO2").unwrap();
    assert_eq!(no2.missing, 6);

    let out = dir.path().join("charts");
    let files = ChartWriter::new(&out).render_exploration(&report)?;
    assert!(!files.is_empty());
    assert!(files.iter().all(|f| f.starts_with(&out) && f.exists()));

    let markdown = ReportWriter::new(ReportFormat::Markdown).render_exploration(&report)?;
    assert!(markdown.contains("## Rain comparison (Rainy days)"));
    Ok(())
}

#[test]
fn test_advanced_from_zip_archive() -> Result<()> {
    let dir = TempDir::new()?;
    let archive = dir.path().join("PRSA2017_Data_20130301-20170228.zip");
    {
        let mut zip = ZipWriter::new(File::create(&archive)?);
        let options = FileOptions::default();
        zip.add_directory("PRSA_Data_20130301-20170228/", options)?;
        for (station, base) in [("Shunyi", 30.0), ("Dingling", 4.0)] {
            zip.start_file(
                format!("PRSA_Data_20130301-20170228/PRSA_Data_{}.csv", station),
                options,
            )?;
            zip.write_all(station_csv(station, base, 4).as_bytes())?;
        }
        zip.finish()?;
    }

    let dataset = DatasetLoader::default().load(&archive)?;
    assert_eq!(dataset.stations(), vec!["Dingling", "Shunyi"]);

    let config = DashboardConfig::default();
    let analyzer = AdvancedAnalyzer::new(config.thresholds.clone())
        .with_window_days(config.rfm.window_days);

    // Dingling: daily PM2.5 means 5.5, 6.5, 7.5, 8.5
    let clean = analyzer.analyze(&dataset, None, None, None)?;
    assert_eq!(clean.station, "Dingling");
    assert_eq!(clean.categories.get(AirQualityCategory::Good), 4);
    let rfm = clean.rfm.as_ref().unwrap();
    assert_eq!(rfm.recency_days, None);
    assert_eq!(rfm.frequency, 0);
    assert_eq!(rfm.magnitude, 0.0);
    assert_eq!(clean.verdict.as_ref().unwrap().category, AirQualityCategory::Good);

    // Shunyi: daily PM2.5 means 31.5, 32.5, 33.5, 34.5
    let polluted = analyzer.analyze(&dataset, Some("Shunyi"), None, None)?;
    let rfm = polluted.rfm.as_ref().unwrap();
    assert_eq!(rfm.recency_days, Some(0));
    assert_eq!(rfm.frequency, 4);
    assert!((rfm.magnitude - 18.0).abs() < 1e-9);
    assert_eq!(polluted.yearly.len(), 2);
    assert_eq!(polluted.yearly[0].total_days, 2);
    assert_eq!(polluted.yearly[0].exceedance(Pollutant::Pm25).unwrap().percentage, 100.0);
    assert_eq!(polluted.verdict.as_ref().unwrap().category, AirQualityCategory::Moderate);

    let text = ReportWriter::default().render_advanced(&polluted)?;
    assert!(text.contains("Advanced Analysis: Shunyi"));
    assert!(text.contains(AirQualityCategory::Moderate.advice()));
    Ok(())
}

#[test]
fn test_export_daily_parquet() -> Result<()> {
    let dir = TempDir::new()?;
    write_directory(dir.path())?;
    let dataset = DatasetLoader::new(1).load(dir.path())?;

    let report = AdvancedAnalyzer::default().analyze(&dataset, Some("Huairou"), None, None)?;
    let records = DailyRecord::from_report(&report);
    assert_eq!(records.len(), 5);

    let output = dir.path().join("export").join("huairou.parquet");
    let writer = ParquetWriter::new().with_compression("zstd")?;
    writer.write_daily_records(&records, &output)?;

    let info = writer.get_file_info(&output)?;
    assert_eq!(info.total_rows, 5);

    let back = writer.read_daily_records(&output, 2)?;
    assert_eq!(back.len(), 2);
    assert_eq!(back[0], records[0]);
    assert_eq!(back[0].station, "Huairou");

    let yearly = dir.path().join("export").join("huairou-yearly.parquet");
    writer.write_yearly_recap(&report, &yearly)?;
    assert_eq!(writer.get_file_info(&yearly)?.total_rows, 2);
    Ok(())
}

#[test]
fn test_unknown_station_lists_known_ones() -> Result<()> {
    let dir = TempDir::new()?;
    write_directory(dir.path())?;
    let dataset = DatasetLoader::new(1).load(dir.path())?;

    let err = AdvancedAnalyzer::default()
        .analyze(&dataset, Some("Gucheng"), None, None)
        .unwrap_err();
    match err {
        DashboardError::StationNotFound { station, known } => {
            assert_eq!(station, "Gucheng");
            assert_eq!(known, "Aotizhongxin, Huairou");
        }
        other => panic!("unexpected error: {}", other),
    }
    Ok(())
}

#[test]
fn test_empty_csv_is_rejected() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("empty.csv");
    std::fs::write(&path, format!("{}\n", HEADER))?;

    let result = DatasetLoader::new(1).load(&path);
    assert!(matches!(result, Err(DashboardError::EmptyDataset(_))));
    Ok(())
}

#[tokio::test]
async fn test_async_load() -> Result<()> {
    let dir = TempDir::new()?;
    write_directory(dir.path())?;

    let dataset = load_dataset_async(dir.path().to_path_buf(), 2).await?;
    assert_eq!(dataset.len(), 40);
    assert_eq!(
        dataset.station_date_bounds("Huairou"),
        Some((
            NaiveDate::from_ymd_opt(2016, 12, 30).unwrap(),
            NaiveDate::from_ymd_opt(2017, 1, 3).unwrap()
        ))
    );
    Ok(())
}
