use crate::analyzers::{AdvancedAnalyzer, ExplorationAnalyzer, InsightTopic};
use crate::cli::args::{Cli, Commands};
use crate::config::DashboardConfig;
use crate::error::{DashboardError, Result};
use crate::models::{AirQualityDataset, FilterSelection, Reading};
use crate::processors::DataQualityChecker;
use crate::readers::load_dataset_async;
use crate::utils::progress::ProgressReporter;
use crate::utils::{generate_default_export_filename, init_logging};
use crate::writers::{ChartWriter, DailyRecord, ParquetWriter, ReportWriter};
use std::path::{Path, PathBuf};
use tracing::info;

pub async fn run(cli: Cli) -> Result<()> {
    init_logging(cli.verbose, cli.log_file.as_deref())?;

    let config = DashboardConfig::load(cli.config.as_deref())?;
    config.log_config();
    let max_workers = cli.max_workers.unwrap_or_else(num_cpus::get).max(1);
    let quiet = cli.quiet;

    match cli.command {
        Commands::Explore {
            input,
            start,
            end,
            stations,
            pollutants,
            pattern_pollutant,
            met_variables,
            no_met,
            rain,
            insights,
            no_insights,
            format,
            output_dir,
            no_charts,
            report_file,
        } => {
            let dataset = load(input, max_workers, quiet).await?;

            let mut selection = FilterSelection::new()
                .with_date_range(start, end)
                .with_stations(stations)
                .with_pattern_pollutant(pattern_pollutant)
                .with_rain_state(rain);
            if !pollutants.is_empty() {
                selection = selection.with_trend_pollutants(pollutants);
            }
            if no_met {
                selection = selection.with_met_variables(Vec::new());
            } else if !met_variables.is_empty() {
                selection = selection.with_met_variables(met_variables);
            }

            let insights = if no_insights {
                Vec::new()
            } else if insights.is_empty() {
                InsightTopic::ALL.to_vec()
            } else {
                insights
            };

            let progress = ProgressReporter::new_spinner("Computing exploration page...", quiet);
            let report =
                ExplorationAnalyzer::new(max_workers).analyze(&dataset, &selection, &insights)?;
            progress.finish_and_clear();

            let writer = ReportWriter::new(format);
            writer.write(&writer.render_exploration(&report)?, report_file.as_deref())?;

            if !no_charts {
                let charts = chart_writer(&config, output_dir).render_exploration(&report)?;
                info!("{} charts written", charts.len());
            }
        }

        Commands::Advanced {
            input,
            station,
            start,
            end,
            format,
            output_dir,
            no_charts,
            report_file,
        } => {
            let dataset = load(input, max_workers, quiet).await?;

            let progress = ProgressReporter::new_spinner("Computing advanced analysis...", quiet);
            let report =
                advanced_analyzer(&config).analyze(&dataset, station.as_deref(), start, end)?;
            progress.finish_and_clear();

            let writer = ReportWriter::new(format);
            writer.write(&writer.render_advanced(&report)?, report_file.as_deref())?;

            if !no_charts {
                let charts = chart_writer(&config, output_dir)
                    .render_advanced(&report, config.thresholds.pm25)?;
                info!("{} charts written", charts.len());
            }
        }

        Commands::Export {
            input,
            station,
            start,
            end,
            output_file,
            compression,
            yearly_output,
        } => {
            let dataset = load(input, max_workers, quiet).await?;
            let writer = ParquetWriter::new().with_compression(&compression)?;

            let report =
                advanced_analyzer(&config).analyze(&dataset, station.as_deref(), start, end)?;
            if report.is_empty() {
                return Err(DashboardError::EmptyDataset(format!(
                    "station {} in the selected date range",
                    report.station
                )));
            }

            let output_file =
                output_file.unwrap_or_else(|| generate_default_export_filename(&report.station));
            let records = DailyRecord::from_report(&report);

            let progress = ProgressReporter::new_spinner("Writing Parquet file...", quiet);
            writer.write_daily_records(&records, &output_file)?;
            progress.finish_with_message(&format!(
                "Wrote {} daily rows to {}",
                records.len(),
                output_file.display()
            ));
            println!("\n{}", writer.get_file_info(&output_file)?.summary());

            if let Some(yearly_output) = yearly_output {
                writer.write_yearly_recap(&report, &yearly_output)?;
                println!("\n{}", writer.get_file_info(&yearly_output)?.summary());
            }
        }

        Commands::Stations { input, format } => {
            let dataset = load(input, max_workers, quiet).await?;
            let rows: Vec<&Reading> = dataset.readings().iter().collect();
            let quality = DataQualityChecker::new().check(&rows);

            let writer = ReportWriter::new(format);
            writer.write(&writer.render_quality(&quality)?, None)?;
        }
    }

    Ok(())
}

async fn load(input: PathBuf, max_workers: usize, quiet: bool) -> Result<AirQualityDataset> {
    let progress =
        ProgressReporter::new_spinner(&format!("Loading {}...", display_name(&input)), quiet);
    let dataset = load_dataset_async(input, max_workers).await?;
    progress.finish_with_message(&format!(
        "Loaded {} readings from {} stations",
        dataset.len(),
        dataset.stations().len()
    ));
    Ok(dataset)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn advanced_analyzer(config: &DashboardConfig) -> AdvancedAnalyzer {
    AdvancedAnalyzer::new(config.thresholds.clone()).with_window_days(config.rfm.window_days)
}

/// Chart writer for the CLI output directory, falling back to the configured one
fn chart_writer(config: &DashboardConfig, output_dir: Option<PathBuf>) -> ChartWriter {
    ChartWriter::new(output_dir.unwrap_or_else(|| config.output.dir.clone()))
        .with_size(config.output.chart_width, config.output.chart_height)
}
