use chrono::{Datelike, Local, NaiveDate};
use std::path::{Path, PathBuf};

use crate::models::FilterSelection;

/// Lowercase, filesystem-safe version of a label: `PM2.5 Trend` -> `pm2_5-trend`
pub fn slugify(label: &str) -> String {
    let mut slug = String::with_capacity(label.len());
    for c in label.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if c == '.' {
            slug.push('_');
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

/// Chart file inside the output directory: `{dir}/{page}-{name}.svg`
pub fn chart_path(output_dir: &Path, page: &str, name: &str) -> PathBuf {
    output_dir.join(format!("{}-{}.svg", slugify(page), slugify(name)))
}

/// Default Parquet export name with format: aq-daily-{station}-{YYMMDD}.parquet
pub fn generate_default_export_filename(station: &str) -> PathBuf {
    let now = Local::now();
    let filename = format!(
        "aq-daily-{}-{:02}{:02}{:02}.parquet",
        slugify(station),
        now.year() % 100,
        now.month(),
        now.day()
    );
    PathBuf::from("output").join(filename)
}

/// Human readable date range for report headers
pub fn describe_range(
    selection: &FilterSelection,
    bounds: Option<(NaiveDate, NaiveDate)>,
) -> String {
    let start = selection.start.or(bounds.map(|b| b.0));
    let end = selection.end.or(bounds.map(|b| b.1));
    match (start, end) {
        (Some(s), Some(e)) => format!("{} to {}", s, e),
        (Some(s), None) => format!("from {}", s),
        (None, Some(e)) => format!("until {}", e),
        (None, None) => "no data".to_string(),
    }
}
