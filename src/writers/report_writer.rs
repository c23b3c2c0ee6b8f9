use crate::analyzers::{AdvancedReport, ExplorationReport};
use crate::error::Result;
use crate::models::Pollutant;
use crate::processors::{pearson, DataQualityChecker, DataQualityReport};
use serde::Serialize;
use std::fmt;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Text,
    Markdown,
    Json,
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReportFormat::Text => "text",
            ReportFormat::Markdown => "markdown",
            ReportFormat::Json => "json",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" | "txt" => Ok(ReportFormat::Text),
            "markdown" | "md" => Ok(ReportFormat::Markdown),
            "json" => Ok(ReportFormat::Json),
            _ => Err(format!("unknown format '{}' (expected text, markdown or json)", s)),
        }
    }
}

/// Column-aligned table rendered as plain text or a Markdown table
struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    fn new<S: Into<String>>(headers: impl IntoIterator<Item = S>) -> Self {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    fn row(&mut self, cells: Vec<String>) {
        self.rows.push(cells);
    }

    fn render(&self, format: ReportFormat) -> String {
        let mut out = String::new();
        if format == ReportFormat::Markdown {
            out.push_str(&format!("| {} |\n", self.headers.join(" | ")));
            out.push_str(&format!("|{}\n", "---|".repeat(self.headers.len())));
            for row in &self.rows {
                out.push_str(&format!("| {} |\n", row.join(" | ")));
            }
            return out;
        }

        let widths: Vec<usize> = (0..self.headers.len())
            .map(|i| {
                self.rows
                    .iter()
                    .filter_map(|r| r.get(i))
                    .map(|c| c.chars().count())
                    .chain(std::iter::once(self.headers[i].chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let line = |cells: &[String]| {
            let padded: Vec<String> = cells
                .iter()
                .zip(&widths)
                .map(|(c, w)| format!("{:<width$}", c, width = *w))
                .collect();
            format!("  {}\n", padded.join("  ").trim_end())
        };

        out.push_str(&line(&self.headers));
        for row in &self.rows {
            out.push_str(&line(row));
        }
        out
    }
}

fn value(v: Option<f64>) -> String {
    v.map_or_else(|| "-".to_string(), |v| format!("{:.2}", v))
}

/// Formats analyzer reports for the terminal, Markdown files or JSON consumers.
pub struct ReportWriter {
    format: ReportFormat,
}

impl ReportWriter {
    pub fn new(format: ReportFormat) -> Self {
        Self { format }
    }

    fn heading(&self, out: &mut String, title: &str) {
        match self.format {
            ReportFormat::Markdown => out.push_str(&format!("\n## {}\n\n", title)),
            _ => out.push_str(&format!("\n--- {} ---\n", title)),
        }
    }

    fn title(&self, out: &mut String, title: &str) {
        match self.format {
            ReportFormat::Markdown => out.push_str(&format!("# {}\n", title)),
            _ => out.push_str(&format!("=== {} ===\n", title)),
        }
    }

    fn line(&self, out: &mut String, text: &str) {
        match self.format {
            ReportFormat::Markdown => out.push_str(&format!("{}\n\n", text)),
            _ => out.push_str(&format!("{}\n", text)),
        }
    }

    fn json<T: Serialize>(report: &T) -> Result<String> {
        Ok(serde_json::to_string_pretty(report)?)
    }

    pub fn render_exploration(&self, report: &ExplorationReport) -> Result<String> {
        if self.format == ReportFormat::Json {
            return Self::json(report);
        }

        let mut out = String::new();
        self.title(&mut out, "Air Quality Exploration");
        self.line(&mut out, &format!("Stations: {}", report.stations.join(", ")));
        self.line(&mut out, &format!("Period: {}", report.date_range));
        self.line(&mut out, &format!("Hourly readings: {}", report.row_count));

        self.heading(&mut out, "Data completeness");
        out.push_str(&self.quality_table(&report.quality));

        self.heading(&mut out, "Yearly trends");
        let mut trends = Table::new(["Year", "Station"]);
        trends
            .headers
            .extend(report.trend_pollutants.iter().map(|p| p.to_string()));
        for row in &report.yearly {
            let mut cells = vec![row.year.to_string(), row.station.clone()];
            cells.extend(report.trend_pollutants.iter().map(|p| value(row.get(*p))));
            trends.row(cells);
        }
        out.push_str(&trends.render(self.format));

        self.heading(&mut out, &format!("Hourly pattern ({})", report.pattern_pollutant));
        let mut hourly = Table::new(["Hour", "Mean"]);
        for h in &report.hourly {
            hourly.row(vec![format!("{:02}", h.hour), value(h.mean)]);
        }
        out.push_str(&hourly.render(self.format));

        self.heading(&mut out, &format!("Weekly pattern ({})", report.pattern_pollutant));
        let mut weekly = Table::new(["Day", "Mean"]);
        for w in &report.weekday {
            weekly.row(vec![w.weekday.clone(), value(w.mean)]);
        }
        out.push_str(&weekly.render(self.format));

        self.heading(&mut out, "Meteorology vs PM2.5");
        match &report.scatter_notice {
            Some(notice) => self.line(&mut out, notice),
            None => {
                let mut scatter = Table::new(["Variable", "Points", "Pearson r"]);
                for series in &report.scatter {
                    scatter.row(vec![
                        series.x.display_name().to_string(),
                        series.points.len().to_string(),
                        value(pearson(&series.points)),
                    ]);
                }
                out.push_str(&scatter.render(self.format));
            }
        }

        self.heading(&mut out, "Correlation matrix");
        let names: Vec<String> = report
            .correlation
            .variables
            .iter()
            .map(|v| v.column_name().to_string())
            .collect();
        let mut corr = Table::new(std::iter::once(String::new()).chain(names.iter().cloned()));
        for (name, values) in names.iter().zip(&report.correlation.values) {
            let mut cells = vec![name.clone()];
            cells.extend(values.iter().map(|v| value(*v)));
            corr.row(cells);
        }
        out.push_str(&corr.render(self.format));

        self.heading(&mut out, &format!("Rain comparison ({})", report.rain.label));
        if report.rain.rows.is_empty() {
            self.line(&mut out, "No readings match the selected rain state.");
        } else {
            let mut rain = Table::new(["Rain", "Hours", "Mean PM2.5"]);
            for r in &report.rain.rows {
                rain.row(vec![
                    if r.raining { "Rain" } else { "No rain" }.to_string(),
                    r.hours.to_string(),
                    value(r.mean_pm25),
                ]);
            }
            out.push_str(&rain.render(self.format));
        }

        if !report.insights.is_empty() {
            self.heading(&mut out, "Insights");
            for insight in &report.insights {
                match self.format {
                    ReportFormat::Markdown => out.push_str(&format!("**{}**\n\n", insight.topic)),
                    _ => out.push_str(&format!("{}:\n", insight.topic)),
                }
                for note in &insight.notes {
                    out.push_str(&format!("  - {}\n", note));
                }
                if self.format == ReportFormat::Markdown {
                    out.push('\n');
                }
            }
        }

        Ok(out)
    }

    pub fn render_advanced(&self, report: &AdvancedReport) -> Result<String> {
        if self.format == ReportFormat::Json {
            return Self::json(report);
        }

        let mut out = String::new();
        self.title(&mut out, &format!("Advanced Analysis: {}", report.station));
        let period = match (report.start, report.end) {
            (Some(s), Some(e)) => format!("{} to {}", s, e),
            _ => "no data".to_string(),
        };
        self.line(&mut out, &format!("Period: {}", period));

        if let Some(notice) = &report.notice {
            self.line(&mut out, notice);
            return Ok(out);
        }
        self.line(&mut out, &format!("Days with data: {}", report.daily.len()));

        if let Some(rfm) = &report.rfm {
            self.heading(
                &mut out,
                &format!("PM2.5 exceedance, last {} days (RFM)", rfm.window_days),
            );
            let mut table = Table::new(["Measure", "Value"]);
            table.row(vec![
                "Recency (days since last exceedance)".to_string(),
                rfm.recency_days
                    .map_or_else(|| "never exceeded".to_string(), |d| d.to_string()),
            ]);
            table.row(vec![
                format!("Frequency (days above {})", rfm.threshold),
                rfm.frequency.to_string(),
            ]);
            table.row(vec![
                "Magnitude (mean excess)".to_string(),
                format!("{:.2}", rfm.magnitude),
            ]);
            table.row(vec![
                "Window".to_string(),
                format!("{} to {}", rfm.window_start, rfm.latest_date),
            ]);
            out.push_str(&table.render(self.format));
        }

        self.heading(&mut out, "Daily PM2.5 categories");
        let mut categories = Table::new(["Category", "Days"]);
        for (category, days) in &report.categories.counts {
            categories.row(vec![category.to_string(), days.to_string()]);
        }
        if report.categories.uncategorised > 0 {
            categories.row(vec![
                "Uncategorised".to_string(),
                report.categories.uncategorised.to_string(),
            ]);
        }
        out.push_str(&categories.render(self.format));

        self.heading(&mut out, "Yearly means");
        let mut means = Table::new(["Year", "Days"]);
        means
            .headers
            .extend(Pollutant::ALL.iter().map(|p| p.to_string()));
        for row in &report.yearly {
            let mut cells = vec![row.year.to_string(), row.total_days.to_string()];
            cells.extend(Pollutant::ALL.iter().map(|p| value(row.mean(*p))));
            means.row(cells);
        }
        out.push_str(&means.render(self.format));

        self.heading(&mut out, "Days above WHO thresholds");
        let mut exceed = Table::new(["Year"]);
        exceed
            .headers
            .extend(Pollutant::ALL.iter().map(|p| p.to_string()));
        for row in &report.yearly {
            let mut cells = vec![row.year.to_string()];
            cells.extend(Pollutant::ALL.iter().map(|p| {
                row.exceedance(*p).map_or_else(
                    || "-".to_string(),
                    |e| format!("{} ({:.1}%)", e.days, e.percentage),
                )
            }));
            exceed.row(cells);
        }
        out.push_str(&exceed.render(self.format));

        self.heading(&mut out, "Conclusion");
        match &report.verdict {
            Some(verdict) => {
                self.line(
                    &mut out,
                    &format!(
                        "Mean daily PM2.5: {:.2} µg/m³ ({})",
                        verdict.mean_pm25, verdict.category
                    ),
                );
                self.line(&mut out, &verdict.advice);
            }
            None => self.line(&mut out, "No PM2.5 readings to draw a conclusion from."),
        }

        Ok(out)
    }

    /// Station listing with coverage and column completeness
    pub fn render_quality(&self, report: &DataQualityReport) -> Result<String> {
        match self.format {
            ReportFormat::Json => Self::json(report),
            ReportFormat::Text => Ok(DataQualityChecker::new().generate_summary(report)),
            ReportFormat::Markdown => {
                let mut out = String::new();
                self.title(&mut out, "Data Quality Report");
                self.line(&mut out, &format!("Total rows: {}", report.total_rows));
                self.heading(&mut out, "Stations");
                let mut stations = Table::new(["Station", "Rows", "First date", "Last date"]);
                for (name, coverage) in &report.stations {
                    stations.row(vec![
                        name.clone(),
                        coverage.rows.to_string(),
                        coverage.first_date.to_string(),
                        coverage.last_date.to_string(),
                    ]);
                }
                out.push_str(&stations.render(self.format));
                self.heading(&mut out, "Missing values");
                out.push_str(&self.quality_table(report));
                Ok(out)
            }
        }
    }

    fn quality_table(&self, report: &DataQualityReport) -> String {
        let mut table = Table::new(["Column", "Missing", "Missing %"]);
        for column in &report.columns {
            table.row(vec![
                column.column.clone(),
                column.missing.to_string(),
                format!("{:.1}", column.missing_percentage()),
            ]);
        }
        table.render(self.format)
    }

    /// Write to `path`, or to stdout when no path is given
    pub fn write(&self, content: &str, path: Option<&Path>) -> Result<()> {
        match path {
            Some(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(path, content)?;
                tracing::info!("Report written to {}", path.display());
            }
            None => {
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(content.as_bytes())?;
                if !content.ends_with('\n') {
                    stdout.write_all(b"\n")?;
                }
            }
        }
        Ok(())
    }
}

impl Default for ReportWriter {
    fn default() -> Self {
        Self::new(ReportFormat::Text)
    }
}
