use crate::analyzers::{AdvancedReport, ExplorationReport};
use crate::error::{DashboardError, Result};
use crate::models::{AirQualityCategory, Pollutant};
use crate::processors::CorrelationMatrix;
use crate::utils::{chart_path, DEFAULT_CHART_HEIGHT, DEFAULT_CHART_WIDTH};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::full_palette::{AMBER_600, GREEN_600, GREY_300, ORANGE_800, PURPLE_700};
use std::ops::Range;
use std::path::PathBuf;
use tracing::{debug, info, warn};

const EXPLORE_PAGE: &str = "explore";
const ADVANCED_PAGE: &str = "advanced";
const CAPTION_FONT: (&str, u32) = ("sans-serif", 24);

/// Renders report sections as SVG files in one output directory.
pub struct ChartWriter {
    output_dir: PathBuf,
    width: u32,
    height: u32,
}

impl ChartWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            width: DEFAULT_CHART_WIDTH,
            height: DEFAULT_CHART_HEIGHT,
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// All exploration charts; returns the files written
    pub fn render_exploration(&self, report: &ExplorationReport) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(&self.output_dir)?;
        let mut written = Vec::new();

        for pollutant in &report.trend_pollutants {
            let series = report.trend_series(*pollutant);
            written.extend(self.trend_chart(*pollutant, &series)?);
        }

        let hourly: Vec<(i32, f64)> = report
            .hourly
            .iter()
            .filter_map(|h| Some((h.hour as i32, h.mean?)))
            .collect();
        written.extend(self.hourly_chart(report.pattern_pollutant, &hourly)?);

        let weekday: Vec<(String, f64)> = report
            .weekday
            .iter()
            .filter_map(|w| Some((w.weekday.clone(), w.mean?)))
            .collect();
        written.extend(self.bar_chart(
            EXPLORE_PAGE,
            &format!("{} weekday", report.pattern_pollutant),
            &format!("Mean {} by day of week", report.pattern_pollutant),
            &weekday,
            |_| BLUE,
        )?);

        if report.scatter_notice.is_none() {
            written.extend(self.scatter_panels(report)?);
        }

        written.extend(self.correlation_heatmap(&report.correlation)?);

        let rain: Vec<(String, f64)> = report
            .rain
            .rows
            .iter()
            .filter_map(|r| {
                let label = if r.raining { "Rain" } else { "No rain" };
                Some((label.to_string(), r.mean_pm25?))
            })
            .collect();
        written.extend(self.bar_chart(
            EXPLORE_PAGE,
            "rain comparison",
            &format!("Mean PM2.5 by rain state ({})", report.rain.label),
            &rain,
            |i| if rain[i].0 == "Rain" { BLUE } else { RGBColor(230, 126, 34) },
        )?);

        info!("Wrote {} exploration charts to {}", written.len(), self.output_dir.display());
        Ok(written)
    }

    /// All advanced-analysis charts; an empty report writes nothing
    pub fn render_advanced(
        &self,
        report: &AdvancedReport,
        pm25_threshold: f64,
    ) -> Result<Vec<PathBuf>> {
        if report.is_empty() {
            warn!("No data for station {}, skipping charts", report.station);
            return Ok(Vec::new());
        }
        std::fs::create_dir_all(&self.output_dir)?;
        let mut written = Vec::new();

        let categories: Vec<(String, f64)> = report
            .categories
            .counts
            .iter()
            .map(|(c, n)| (c.label().to_string(), *n as f64))
            .collect();
        written.extend(self.bar_chart(
            ADVANCED_PAGE,
            &format!("{} categories", report.station),
            &format!("PM2.5 category days at {}", report.station),
            &categories,
            |i| category_color(AirQualityCategory::ALL[i]),
        )?);

        let yearly: Vec<(i32, f64)> = report
            .yearly
            .iter()
            .filter_map(|r| Some((r.year, r.mean(Pollutant::Pm25)?)))
            .collect();
        written.extend(self.yearly_mean_chart(&report.station, &yearly, pm25_threshold)?);

        let pct: Vec<(i32, f64)> = report
            .yearly
            .iter()
            .filter_map(|r| Some((r.year, r.exceedance(Pollutant::Pm25)?.percentage)))
            .collect();
        written.extend(self.exceedance_chart(&report.station, &pct)?);

        info!("Wrote {} advanced charts to {}", written.len(), self.output_dir.display());
        Ok(written)
    }

    fn trend_chart(
        &self,
        pollutant: Pollutant,
        series: &[(String, Vec<(i32, Option<f64>)>)],
    ) -> Result<Option<PathBuf>> {
        let points: Vec<(String, Vec<(i32, f64)>)> = series
            .iter()
            .map(|(station, values)| {
                let present: Vec<(i32, f64)> = values
                    .iter()
                    .filter_map(|(year, v)| Some((*year, (*v)?)))
                    .collect();
                (station.clone(), present)
            })
            .filter(|(_, values)| !values.is_empty())
            .collect();

        let all = points.iter().flat_map(|(_, v)| v.iter().copied());
        let Some((years, y_max)) = bounds(all) else {
            warn!("No {} trend data, skipping chart", pollutant);
            return Ok(None);
        };

        let path = chart_path(&self.output_dir, EXPLORE_PAGE, &format!("{} trend", pollutant));
        {
            let root = SVGBackend::new(&path, (self.width, self.height)).into_drawing_area();
            root.fill(&WHITE).map_err(DashboardError::chart)?;

            let mut chart = ChartBuilder::on(&root)
                .caption(format!("Yearly mean {} per station", pollutant), CAPTION_FONT)
                .margin(15)
                .x_label_area_size(40)
                .y_label_area_size(60)
                .build_cartesian_2d((years.0 - 1)..(years.1 + 1), 0f64..y_max * 1.1)
                .map_err(DashboardError::chart)?;

            chart
                .configure_mesh()
                .x_desc("Year")
                .y_desc(format!("{} ({})", pollutant, unit(pollutant)))
                .x_label_formatter(&|y| y.to_string())
                .draw()
                .map_err(DashboardError::chart)?;

            for (idx, (station, values)) in points.iter().enumerate() {
                let color = Palette99::pick(idx).to_rgba();
                chart
                    .draw_series(LineSeries::new(values.clone(), color.stroke_width(2)))
                    .map_err(DashboardError::chart)?
                    .label(station.as_str())
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &color));
                chart
                    .draw_series(values.iter().map(|p| Circle::new(*p, 4, color.filled())))
                    .map_err(DashboardError::chart)?;
            }

            chart
                .configure_series_labels()
                .background_style(&WHITE.mix(0.8))
                .border_style(&BLACK)
                .draw()
                .map_err(DashboardError::chart)?;

            root.present().map_err(DashboardError::chart)?;
        }

        debug!("Wrote {}", path.display());
        Ok(Some(path))
    }

    fn hourly_chart(&self, pollutant: Pollutant, points: &[(i32, f64)]) -> Result<Option<PathBuf>> {
        let Some((_, y_max)) = bounds(points.iter().copied()) else {
            warn!("No hourly {} data, skipping chart", pollutant);
            return Ok(None);
        };

        let path = chart_path(&self.output_dir, EXPLORE_PAGE, &format!("{} hourly", pollutant));
        {
            let root = SVGBackend::new(&path, (self.width, self.height)).into_drawing_area();
            root.fill(&WHITE).map_err(DashboardError::chart)?;

            let mut chart = ChartBuilder::on(&root)
                .caption(format!("Mean {} by hour of day", pollutant), CAPTION_FONT)
                .margin(15)
                .x_label_area_size(40)
                .y_label_area_size(60)
                .build_cartesian_2d(0i32..23i32, 0f64..y_max * 1.1)
                .map_err(DashboardError::chart)?;

            chart
                .configure_mesh()
                .x_labels(24)
                .x_desc("Hour")
                .y_desc(format!("{} ({})", pollutant, unit(pollutant)))
                .draw()
                .map_err(DashboardError::chart)?;

            chart
                .draw_series(LineSeries::new(points.to_vec(), BLUE.stroke_width(2)))
                .map_err(DashboardError::chart)?;
            chart
                .draw_series(points.iter().map(|p| Circle::new(*p, 3, BLUE.filled())))
                .map_err(DashboardError::chart)?;

            root.present().map_err(DashboardError::chart)?;
        }

        Ok(Some(path))
    }

    fn bar_chart<F>(
        &self,
        page: &str,
        name: &str,
        caption: &str,
        bars: &[(String, f64)],
        color: F,
    ) -> Result<Option<PathBuf>>
    where
        F: Fn(usize) -> RGBColor,
    {
        if bars.is_empty() {
            warn!("No data for {} chart, skipping", name);
            return Ok(None);
        }
        let y_max = bars.iter().map(|(_, v)| *v).fold(0.0, f64::max).max(1.0);

        let path = chart_path(&self.output_dir, page, name);
        {
            let root = SVGBackend::new(&path, (self.width, self.height)).into_drawing_area();
            root.fill(&WHITE).map_err(DashboardError::chart)?;

            let mut chart = ChartBuilder::on(&root)
                .caption(caption, CAPTION_FONT)
                .margin(15)
                .x_label_area_size(40)
                .y_label_area_size(60)
                .build_cartesian_2d((0..bars.len() as i32).into_segmented(), 0f64..y_max * 1.1)
                .map_err(DashboardError::chart)?;

            let label = |v: &SegmentValue<i32>| segment_label(v, bars);
            chart
                .configure_mesh()
                .disable_x_mesh()
                .x_labels(bars.len())
                .x_label_formatter(&label)
                .draw()
                .map_err(DashboardError::chart)?;

            chart
                .draw_series(bars.iter().enumerate().map(|(i, (_, v))| {
                    let mut bar = Rectangle::new(
                        [
                            (SegmentValue::Exact(i as i32), 0.0),
                            (SegmentValue::Exact(i as i32 + 1), *v),
                        ],
                        color(i).filled(),
                    );
                    bar.set_margin(0, 0, 12, 12);
                    bar
                }))
                .map_err(DashboardError::chart)?;

            root.present().map_err(DashboardError::chart)?;
        }

        Ok(Some(path))
    }

    fn scatter_panels(&self, report: &ExplorationReport) -> Result<Vec<PathBuf>> {
        let panels: Vec<_> = report.scatter.iter().filter(|s| !s.points.is_empty()).collect();
        if panels.is_empty() {
            warn!("No meteorology/PM2.5 pairs, skipping scatter chart");
            return Ok(Vec::new());
        }

        let path = chart_path(&self.output_dir, EXPLORE_PAGE, "meteorology scatter");
        {
            let root = SVGBackend::new(&path, (self.width, self.height)).into_drawing_area();
            root.fill(&WHITE).map_err(DashboardError::chart)?;
            let areas = root.split_evenly((1, panels.len()));

            for (area, series) in areas.iter().zip(&panels) {
                let (x_min, x_max) = min_max(series.points.iter().map(|p| p.0));
                let (_, y_max) = min_max(series.points.iter().map(|p| p.1));
                let pad = ((x_max - x_min) * 0.05).max(0.5);

                let mut chart = ChartBuilder::on(area)
                    .caption(
                        format!("{} vs {}", series.x.display_name(), series.y),
                        ("sans-serif", 16),
                    )
                    .margin(8)
                    .x_label_area_size(30)
                    .y_label_area_size(45)
                    .build_cartesian_2d((x_min - pad)..(x_max + pad), 0f64..y_max.max(1.0) * 1.05)
                    .map_err(DashboardError::chart)?;

                chart
                    .configure_mesh()
                    .x_labels(5)
                    .x_desc(series.x.column_name())
                    .y_desc(series.y.column_name())
                    .draw()
                    .map_err(DashboardError::chart)?;

                chart
                    .draw_series(
                        series
                            .points
                            .iter()
                            .map(|p| Circle::new(*p, 2, BLUE.mix(0.3).filled())),
                    )
                    .map_err(DashboardError::chart)?;
            }

            root.present().map_err(DashboardError::chart)?;
        }

        Ok(vec![path])
    }

    fn correlation_heatmap(&self, matrix: &CorrelationMatrix) -> Result<Option<PathBuf>> {
        if matrix.values.iter().flatten().all(Option::is_none) {
            warn!("Correlation matrix is empty, skipping heatmap");
            return Ok(None);
        }

        let n = matrix.variables.len() as i32;
        let labels: Vec<(String, f64)> = matrix
            .variables
            .iter()
            .map(|v| (v.column_name().to_string(), 0.0))
            .collect();

        let path = chart_path(&self.output_dir, EXPLORE_PAGE, "correlation");
        {
            let side = self.height.min(self.width);
            let root = SVGBackend::new(&path, (side, side)).into_drawing_area();
            root.fill(&WHITE).map_err(DashboardError::chart)?;

            let mut chart = ChartBuilder::on(&root)
                .caption("Correlation of meteorology and pollutants", CAPTION_FONT)
                .margin(15)
                .x_label_area_size(40)
                .y_label_area_size(60)
                .build_cartesian_2d((0..n).into_segmented(), (0..n).into_segmented())
                .map_err(DashboardError::chart)?;

            let label = |v: &SegmentValue<i32>| segment_label(v, &labels);
            chart
                .configure_mesh()
                .disable_mesh()
                .x_labels(n as usize)
                .y_labels(n as usize)
                .x_label_formatter(&label)
                .y_label_formatter(&label)
                .draw()
                .map_err(DashboardError::chart)?;

            let cells = (0..n).flat_map(|i| (0..n).map(move |j| (i, j)));
            let cell_value = |i: i32, j: i32| matrix.values[i as usize][j as usize];

            chart
                .draw_series(cells.clone().map(|(i, j)| {
                    Rectangle::new(
                        [
                            (SegmentValue::Exact(j), SegmentValue::Exact(i)),
                            (SegmentValue::Exact(j + 1), SegmentValue::Exact(i + 1)),
                        ],
                        correlation_color(cell_value(i, j)).filled(),
                    )
                }))
                .map_err(DashboardError::chart)?;

            chart
                .draw_series(cells.filter_map(|(i, j)| {
                    let r = cell_value(i, j)?;
                    Some(Text::new(
                        format!("{:.2}", r),
                        (SegmentValue::CenterOf(j), SegmentValue::CenterOf(i)),
                        ("sans-serif", 13).into_font().color(&BLACK),
                    ))
                }))
                .map_err(DashboardError::chart)?;

            root.present().map_err(DashboardError::chart)?;
        }

        Ok(Some(path))
    }

    fn yearly_mean_chart(
        &self,
        station: &str,
        yearly: &[(i32, f64)],
        threshold: f64,
    ) -> Result<Option<PathBuf>> {
        if yearly.is_empty() {
            warn!("No yearly PM2.5 means for {}, skipping chart", station);
            return Ok(None);
        }
        let y_max = yearly
            .iter()
            .map(|(_, v)| *v)
            .fold(threshold, f64::max)
            .max(1.0);
        let bars: Vec<(String, f64)> = yearly.iter().map(|(y, v)| (y.to_string(), *v)).collect();

        let name = format!("{} yearly pm2.5", station);
        let path = chart_path(&self.output_dir, ADVANCED_PAGE, &name);
        {
            let root = SVGBackend::new(&path, (self.width, self.height)).into_drawing_area();
            root.fill(&WHITE).map_err(DashboardError::chart)?;

            let mut chart = ChartBuilder::on(&root)
                .caption(format!("Yearly mean PM2.5 at {}", station), CAPTION_FONT)
                .margin(15)
                .x_label_area_size(40)
                .y_label_area_size(60)
                .build_cartesian_2d((0..bars.len() as i32).into_segmented(), 0f64..y_max * 1.15)
                .map_err(DashboardError::chart)?;

            let label = |v: &SegmentValue<i32>| segment_label(v, &bars);
            chart
                .configure_mesh()
                .disable_x_mesh()
                .x_labels(bars.len())
                .x_label_formatter(&label)
                .y_desc("PM2.5 (µg/m³)")
                .draw()
                .map_err(DashboardError::chart)?;

            chart
                .draw_series(bars.iter().enumerate().map(|(i, (_, v))| {
                    let mut bar = Rectangle::new(
                        [
                            (SegmentValue::Exact(i as i32), 0.0),
                            (SegmentValue::Exact(i as i32 + 1), *v),
                        ],
                        BLUE.mix(0.7).filled(),
                    );
                    bar.set_margin(0, 0, 12, 12);
                    bar
                }))
                .map_err(DashboardError::chart)?;

            let (x_range, _) = chart.plotting_area().get_pixel_range();
            let (_, y) = chart.backend_coord(&(SegmentValue::Exact(0), threshold));
            draw_dashed_threshold(&root, x_range, y, threshold)?;
            root.present().map_err(DashboardError::chart)?;
        }

        Ok(Some(path))
    }

    fn exceedance_chart(&self, station: &str, pct: &[(i32, f64)]) -> Result<Option<PathBuf>> {
        let Some((years, _)) = bounds(pct.iter().copied()) else {
            warn!("No exceedance data for {}, skipping chart", station);
            return Ok(None);
        };

        let path = chart_path(&self.output_dir, ADVANCED_PAGE, &format!("{} exceedance", station));
        {
            let root = SVGBackend::new(&path, (self.width, self.height)).into_drawing_area();
            root.fill(&WHITE).map_err(DashboardError::chart)?;

            let mut chart = ChartBuilder::on(&root)
                .caption(format!("Days above the PM2.5 threshold at {} (%)", station), CAPTION_FONT)
                .margin(15)
                .x_label_area_size(40)
                .y_label_area_size(60)
                .build_cartesian_2d((years.0 - 1)..(years.1 + 1), 0f64..100f64)
                .map_err(DashboardError::chart)?;

            chart
                .configure_mesh()
                .x_desc("Year")
                .y_desc("% of days")
                .x_label_formatter(&|y| y.to_string())
                .draw()
                .map_err(DashboardError::chart)?;

            chart
                .draw_series(LineSeries::new(pct.to_vec(), RED.stroke_width(2)))
                .map_err(DashboardError::chart)?;
            chart
                .draw_series(pct.iter().map(|p| Circle::new(*p, 4, RED.filled())))
                .map_err(DashboardError::chart)?;

            root.present().map_err(DashboardError::chart)?;
        }

        Ok(Some(path))
    }
}

impl Default for ChartWriter {
    fn default() -> Self {
        Self::new(crate::utils::DEFAULT_OUTPUT_DIR)
    }
}

/// Red dashed horizontal line across the plotting area at `threshold`
fn draw_dashed_threshold(
    root: &DrawingArea<SVGBackend<'_>, Shift>,
    x_range: Range<i32>,
    y: i32,
    threshold: f64,
) -> Result<()> {
    let style = RED.stroke_width(2);

    let mut x = x_range.start;
    while x < x_range.end {
        let end = (x + 10).min(x_range.end);
        root.draw(&PathElement::new(vec![(x, y), (end, y)], style))
            .map_err(DashboardError::chart)?;
        x += 16;
    }

    root.draw(&Text::new(
        format!("WHO threshold {}", threshold),
        (x_range.end - 160, y - 18),
        ("sans-serif", 14).into_font().color(&RED),
    ))
    .map_err(DashboardError::chart)?;
    Ok(())
}

fn segment_label(value: &SegmentValue<i32>, labels: &[(String, f64)]) -> String {
    match value {
        SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => labels
            .get(*i as usize)
            .map(|(label, _)| label.clone())
            .unwrap_or_default(),
        SegmentValue::Last => String::new(),
    }
}

/// Year span and the largest value; `None` without points
fn bounds(points: impl Iterator<Item = (i32, f64)>) -> Option<((i32, i32), f64)> {
    points.fold(None, |acc, (x, y)| match acc {
        None => Some(((x, x), y.max(1.0))),
        Some(((lo, hi), top)) => Some(((lo.min(x), hi.max(x)), top.max(y))),
    })
}

fn min_max(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)))
}

fn unit(pollutant: Pollutant) -> &'static str {
    pollutant.threshold_unit()
}

fn category_color(category: AirQualityCategory) -> RGBColor {
    match category {
        AirQualityCategory::Good => GREEN_600,
        AirQualityCategory::Moderate => AMBER_600,
        AirQualityCategory::Unhealthy => ORANGE_800,
        AirQualityCategory::VeryUnhealthy => RED,
        AirQualityCategory::Hazardous => PURPLE_700,
    }
}

/// Diverging red-blue scale: -1 blue, 0 white, +1 red
fn correlation_color(value: Option<f64>) -> RGBColor {
    let Some(r) = value else {
        return GREY_300;
    };
    let t = r.clamp(-1.0, 1.0).abs();
    let fade = (255.0 * (1.0 - t)).round() as u8;
    if r >= 0.0 {
        RGBColor(255, fade, fade)
    } else {
        RGBColor(fade, fade, 255)
    }
}
