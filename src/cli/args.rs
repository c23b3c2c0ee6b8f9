use crate::analyzers::InsightTopic;
use crate::models::{MetVariable, Pollutant, RainState};
use crate::writers::ReportFormat;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "aq-dashboard")]
#[command(about = "Air-quality explorer for multi-station hourly pollution data")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(short, long, global = true, help = "Hide progress spinners")]
    pub quiet: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,

    #[arg(long, global = true, help = "Configuration file [default: ./aq-dashboard.toml]")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Worker threads [default: number of CPUs]")]
    pub max_workers: Option<usize>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Trends, daily/weekly patterns, meteorology and rain impact across stations
    Explore {
        #[arg(short, long, help = "CSV file, directory of CSVs or zip archive")]
        input: PathBuf,

        #[arg(long, help = "First date to include (YYYY-MM-DD)")]
        start: Option<NaiveDate>,

        #[arg(long, help = "Last date to include (YYYY-MM-DD)")]
        end: Option<NaiveDate>,

        #[arg(short, long = "station", help = "Station to include (repeatable) [default: all]")]
        stations: Vec<String>,

        #[arg(
            short,
            long = "pollutant",
            help = "Trend pollutant (repeatable) [default: PM2.5, PM10, NO2]"
        )]
        pollutants: Vec<Pollutant>,

        #[arg(
            long,
            default_value = "PM2.5",
            help = "Pollutant for the hourly and weekday patterns"
        )]
        pattern_pollutant: Pollutant,

        #[arg(
            long = "met",
            help = "Meteorological variable for the scatter panels (repeatable) [default: all]"
        )]
        met_variables: Vec<MetVariable>,

        #[arg(long, default_value = "false", conflicts_with = "met_variables")]
        no_met: bool,

        #[arg(long, default_value = "all", help = "Rain state: all, rainy or dry")]
        rain: RainState,

        #[arg(long = "insight", help = "Insight notes to show (repeatable) [default: all]")]
        insights: Vec<InsightTopic>,

        #[arg(long, default_value = "false", conflicts_with = "insights")]
        no_insights: bool,

        #[arg(short, long, default_value = "text", help = "Report format: text, markdown or json")]
        format: ReportFormat,

        #[arg(short, long, help = "Chart directory [default: output]")]
        output_dir: Option<PathBuf>,

        #[arg(long, default_value = "false")]
        no_charts: bool,

        #[arg(long, help = "Write the report to a file instead of stdout")]
        report_file: Option<PathBuf>,
    },

    /// Per-station RFM exceedance summary, daily categories and yearly WHO recap
    Advanced {
        #[arg(short, long, help = "CSV file, directory of CSVs or zip archive")]
        input: PathBuf,

        #[arg(short, long, help = "Station to analyze [default: first station]")]
        station: Option<String>,

        #[arg(long)]
        start: Option<NaiveDate>,

        #[arg(long)]
        end: Option<NaiveDate>,

        #[arg(short, long, default_value = "text")]
        format: ReportFormat,

        #[arg(short, long, help = "Chart directory [default: output]")]
        output_dir: Option<PathBuf>,

        #[arg(long, default_value = "false")]
        no_charts: bool,

        #[arg(long)]
        report_file: Option<PathBuf>,
    },

    /// Export a station's daily means and categories to Parquet
    Export {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        station: Option<String>,

        #[arg(long)]
        start: Option<NaiveDate>,

        #[arg(long)]
        end: Option<NaiveDate>,

        #[arg(
            short,
            long,
            help = "Output Parquet file path [default: output/aq-daily-{station}-{YYMMDD}.parquet]"
        )]
        output_file: Option<PathBuf>,

        #[arg(short, long, default_value = "snappy")]
        compression: String,

        #[arg(long, help = "Also write the yearly WHO recap to this Parquet file")]
        yearly_output: Option<PathBuf>,
    },

    /// List stations, their date ranges and missing-value counts
    Stations {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long, default_value = "text")]
        format: ReportFormat,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_explore_arguments() {
        let cli = Cli::try_parse_from([
            "aq-dashboard",
            "explore",
            "--input",
            "data.zip",
            "--station",
            "Dongsi",
            "--station",
            "Tiantan",
            "--pollutant",
            "pm10",
            "--met",
            "TEMP",
            "--rain",
            "dry",
            "--start",
            "2015-01-01",
            "-f",
            "markdown",
            "-v",
            "-q",
        ])
        .unwrap();

        assert!(cli.verbose);
        assert!(cli.quiet);
        match cli.command {
            Commands::Explore {
                stations,
                pollutants,
                met_variables,
                rain,
                start,
                format,
                pattern_pollutant,
                ..
            } => {
                assert_eq!(stations, vec!["Dongsi", "Tiantan"]);
                assert_eq!(pollutants, vec![Pollutant::Pm10]);
                assert_eq!(met_variables, vec![MetVariable::Temp]);
                assert_eq!(rain, RainState::Dry);
                assert_eq!(start, NaiveDate::from_ymd_opt(2015, 1, 1));
                assert_eq!(format, ReportFormat::Markdown);
                assert_eq!(pattern_pollutant, Pollutant::Pm25);
            }
            _ => panic!("expected explore"),
        }
    }

    #[test]
    fn test_invalid_pollutant_rejected() {
        let result = Cli::try_parse_from([
            "aq-dashboard",
            "explore",
            "--input",
            "data.csv",
            "--pollutant",
            "ozone-ish",
        ]);
        assert!(result.is_err());
    }
}
