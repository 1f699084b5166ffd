use crate::error::RenderError;
use crate::models::chart::{ChartRequest, ChartStyle, Theme};
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder};
use plotters::prelude::*;
use plotters::style::register_font;
use std::collections::HashSet;
use std::fmt::Display;

pub const DEFAULT_WIDTH: u32 = 1000;
pub const DEFAULT_HEIGHT: u32 = 500;
pub const DEFAULT_STROKE_WIDTH: u32 = 2;

const FONT_FAMILY: &str = "sans-serif";
const FONT_BYTES: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");

// Roughly one x label per this many pixels.
const PIXELS_PER_X_LABEL: u32 = 100;
const ROTATE_X_LABELS_ABOVE: usize = 8;

lazy_static::lazy_static! {
    static ref FONT_READY: bool = register_font(FONT_FAMILY, FontStyle::Normal, FONT_BYTES).is_ok();
}

struct Palette {
    background: RGBColor,
    title: RGBColor,
    text: RGBColor,
    grid: RGBColor,
    grid_alpha: f64,
}

impl Palette {
    fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Dark => Palette {
                background: RGBColor(0x1f, 0x1f, 0x1f),
                title: RGBColor(0xee, 0xee, 0xee),
                text: RGBColor(0xbb, 0xbb, 0xbb),
                grid: RGBColor(0x44, 0x44, 0x44),
                grid_alpha: 0.5,
            },
            Theme::Light => Palette {
                background: WHITE,
                title: BLACK,
                text: BLACK,
                grid: BLACK,
                grid_alpha: 0.2,
            },
        }
    }
}

/// What was drawn, alongside the encoded image.
#[derive(Debug, Clone)]
pub struct RenderedChart {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub points_plotted: usize,
    pub distinct_days: usize,
}

/// Turns a `ChartRequest` into a PNG. Holds only canvas configuration.
#[derive(Debug, Clone)]
pub struct ChartRenderer {
    width: u32,
    height: u32,
    stroke_width: u32,
}

impl Default for ChartRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }
}

impl ChartRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            stroke_width: DEFAULT_STROKE_WIDTH,
        }
    }

    pub fn with_stroke_width(mut self, stroke_width: u32) -> Self {
        self.stroke_width = stroke_width.max(1);
        self
    }

    pub fn render(&self, request: &ChartRequest) -> Result<Vec<u8>, RenderError> {
        self.render_chart(request).map(|chart| chart.png)
    }

    pub fn render_chart(&self, request: &ChartRequest) -> Result<RenderedChart, RenderError> {
        if request.points.is_empty() {
            return Err(RenderError::InvalidInput("no points to plot".to_string()));
        }
        if self.width == 0 || self.height == 0 {
            return Err(RenderError::InvalidInput(format!(
                "canvas size {}x{} is empty",
                self.width, self.height
            )));
        }

        let mut series = Vec::with_capacity(request.points.len());
        for point in &request.points {
            if !point.value.is_finite() {
                return Err(RenderError::InvalidInput(format!(
                    "non-finite value at timestamp {}",
                    point.timestamp_ms
                )));
            }
            let date = point.datetime().ok_or_else(|| {
                RenderError::InvalidInput(format!("timestamp {} out of range", point.timestamp_ms))
            })?;
            series.push((date, point.value));
        }

        if !*FONT_READY {
            return Err(RenderError::Font);
        }

        let mut buffer = vec![0u8; (self.width as usize) * (self.height as usize) * 3];
        self.draw(request, &series, &mut buffer)?;
        let png = encode_png(&buffer, self.width, self.height)?;

        let distinct_days = series
            .iter()
            .map(|(date, _)| date.date_naive())
            .collect::<HashSet<NaiveDate>>()
            .len();

        Ok(RenderedChart {
            png,
            width: self.width,
            height: self.height,
            points_plotted: series.len(),
            distinct_days,
        })
    }

    fn draw(
        &self,
        request: &ChartRequest,
        series: &[(DateTime<Utc>, f64)],
        buffer: &mut [u8],
    ) -> Result<(), RenderError> {
        let palette = Palette::for_theme(request.theme);
        let line_color = RGBColor(request.line_color.0, request.line_color.1, request.line_color.2);

        let root = BitMapBackend::with_buffer(buffer, (self.width, self.height)).into_drawing_area();
        root.fill(&palette.background).map_err(backend)?;

        let label_count = self.x_label_count(series.len());
        let rotate = label_count > ROTATE_X_LABELS_ABOVE;
        let date_format = date_format(series);

        let mut x_font = (FONT_FAMILY, 12).into_font();
        if rotate {
            x_font = x_font.transform(FontTransform::Rotate90);
        }
        let x_label_style = x_font.color(&palette.text);
        let y_label_style = (FONT_FAMILY, 12).into_font().color(&palette.text);
        let desc_style = (FONT_FAMILY, 14).into_font().color(&palette.text);
        let title_style = (FONT_FAMILY, 20).into_font().color(&palette.title);

        let mut builder = ChartBuilder::on(&root);
        builder
            .caption(&request.title, title_style)
            .margin(16)
            .x_label_area_size(if rotate { 110 } else { 50 })
            .y_label_area_size(90);

        let bold_grid = palette.grid.mix(palette.grid_alpha);
        let light_grid = palette.grid.mix(palette.grid_alpha * 0.3);
        let fmt_y = |v: &f64| compact_number(*v);

        match request.style {
            ChartStyle::Bar => {
                let (y_min, y_max) = value_bounds(series, true);
                let mut chart = builder
                    .build_cartesian_2d((0..series.len()).into_segmented(), y_min..y_max)
                    .map_err(backend)?;

                let fmt_x = |v: &SegmentValue<usize>| match v {
                    SegmentValue::Exact(i) | SegmentValue::CenterOf(i) => series
                        .get(*i)
                        .map(|(date, _)| date.format(date_format).to_string())
                        .unwrap_or_default(),
                    SegmentValue::Last => String::new(),
                };

                chart
                    .configure_mesh()
                    .bold_line_style(bold_grid)
                    .light_line_style(light_grid)
                    .axis_style(palette.text)
                    .x_labels(label_count)
                    .y_labels(8)
                    .x_label_style(x_label_style)
                    .y_label_style(y_label_style)
                    .axis_desc_style(desc_style)
                    .x_label_formatter(&fmt_x)
                    .y_label_formatter(&fmt_y)
                    .x_desc("Date")
                    .y_desc(request.y_label.as_str())
                    .draw()
                    .map_err(backend)?;

                // Bars thinner than a few pixels lose their gap.
                let gap = if self.width as usize / series.len() > 4 { 1 } else { 0 };
                let baseline = y_min.max(0.0).min(y_max);
                chart
                    .draw_series(series.iter().enumerate().map(|(i, &(_, value))| {
                        let mut bar = Rectangle::new(
                            [(SegmentValue::Exact(i), baseline), (SegmentValue::Exact(i + 1), value)],
                            line_color.mix(0.85).filled(),
                        );
                        bar.set_margin(0, 0, gap, gap);
                        bar
                    }))
                    .map_err(backend)?;
            }
            style => {
                let (x_start, x_end) = time_bounds(series);
                let (y_min, y_max) = value_bounds(series, false);
                let mut chart = builder
                    .build_cartesian_2d(x_start..x_end, y_min..y_max)
                    .map_err(backend)?;

                let fmt_x = |date: &DateTime<Utc>| date.format(date_format).to_string();

                chart
                    .configure_mesh()
                    .bold_line_style(bold_grid)
                    .light_line_style(light_grid)
                    .axis_style(palette.text)
                    .x_labels(label_count)
                    .y_labels(8)
                    .x_label_style(x_label_style)
                    .y_label_style(y_label_style)
                    .axis_desc_style(desc_style)
                    .x_label_formatter(&fmt_x)
                    .y_label_formatter(&fmt_y)
                    .x_desc("Date")
                    .y_desc(request.y_label.as_str())
                    .draw()
                    .map_err(backend)?;

                let stroke = line_color.stroke_width(self.stroke_width);
                match style {
                    ChartStyle::Area => {
                        chart
                            .draw_series(
                                AreaSeries::new(series.iter().copied(), y_min, line_color.mix(0.25))
                                    .border_style(stroke),
                            )
                            .map_err(backend)?;
                    }
                    ChartStyle::Scatter => {
                        chart
                            .draw_series(
                                series
                                    .iter()
                                    .map(|&(date, value)| Circle::new((date, value), 4, line_color.filled())),
                            )
                            .map_err(backend)?;
                    }
                    _ => {
                        chart
                            .draw_series(LineSeries::new(series.iter().copied(), stroke))
                            .map_err(backend)?;
                    }
                }
            }
        }

        root.present().map_err(backend)?;
        Ok(())
    }

    fn x_label_count(&self, points: usize) -> usize {
        let by_width = (self.width / PIXELS_PER_X_LABEL).max(2) as usize;
        by_width.min(points).max(1)
    }
}

fn backend<E: Display>(e: E) -> RenderError {
    RenderError::Backend(e.to_string())
}

fn encode_png(buffer: &[u8], width: u32, height: u32) -> Result<Vec<u8>, RenderError> {
    let mut png = Vec::new();
    PngEncoder::new(&mut png)
        .write_image(buffer, width, height, ColorType::Rgb8)
        .map_err(|e| RenderError::Encode(e.to_string()))?;
    Ok(png)
}

/// Intraday ranges get a time of day; anything longer gets a calendar date.
fn date_format(series: &[(DateTime<Utc>, f64)]) -> &'static str {
    let (start, end) = time_bounds(series);
    if end - start <= ChronoDuration::days(2) {
        "%m-%d %H:%M"
    } else {
        "%Y-%m-%d"
    }
}

fn time_bounds(series: &[(DateTime<Utc>, f64)]) -> (DateTime<Utc>, DateTime<Utc>) {
    let mut start = series[0].0;
    let mut end = series[0].0;
    for (date, _) in series {
        start = start.min(*date);
        end = end.max(*date);
    }
    if start == end {
        (start - ChronoDuration::hours(1), end + ChronoDuration::hours(1))
    } else {
        (start, end)
    }
}

fn value_bounds(series: &[(DateTime<Utc>, f64)], include_zero: bool) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for (_, value) in series {
        min = min.min(*value);
        max = max.max(*value);
    }
    if include_zero {
        min = min.min(0.0);
        max = max.max(0.0);
    }

    let span = max - min;
    let pad = if span > f64::EPSILON {
        span * 0.05
    } else {
        (max.abs() * 0.05).max(1.0)
    };

    let lower = if include_zero && min >= 0.0 { 0.0 } else { min - pad };
    (lower, max + pad)
}

/// Axis label for potentially huge values (market caps run into trillions).
fn compact_number(value: f64) -> String {
    let abs = value.abs();
    let (scaled, suffix) = if abs >= 1e12 {
        (value / 1e12, "T")
    } else if abs >= 1e9 {
        (value / 1e9, "B")
    } else if abs >= 1e6 {
        (value / 1e6, "M")
    } else if abs >= 1e3 {
        (value / 1e3, "K")
    } else {
        (value, "")
    };

    if !suffix.is_empty() {
        format!("{:.2}{}", scaled, suffix)
    } else if abs >= 1.0 || abs == 0.0 {
        format!("{:.2}", value)
    } else {
        format!("{:.6}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::chart::Rgb;
    use crate::models::series::TimeSeriesPoint;

    fn request(points: Vec<TimeSeriesPoint>, style: ChartStyle, theme: Theme) -> ChartRequest {
        ChartRequest {
            points,
            style,
            theme,
            title: "Bitcoin Price Chart (7 Days)".to_string(),
            y_label: "Price (USD)".to_string(),
            line_color: Rgb(0x00, 0xd8, 0xff),
        }
    }

    fn two_days() -> Vec<TimeSeriesPoint> {
        vec![
            TimeSeriesPoint::new(1700000000000, 42000.0),
            TimeSeriesPoint::new(1700086400000, 43000.0),
        ]
    }

    fn hourly(count: usize) -> Vec<TimeSeriesPoint> {
        (0..count)
            .map(|i| {
                TimeSeriesPoint::new(
                    1700000000000 + i as i64 * 3_600_000,
                    40000.0 + (i as f64 * 0.7).sin() * 500.0,
                )
            })
            .collect()
    }

    #[test]
    fn renders_decodable_png_for_every_style_and_theme() {
        let renderer = ChartRenderer::new(640, 320);
        for style in [ChartStyle::Line, ChartStyle::Bar, ChartStyle::Area, ChartStyle::Scatter] {
            for theme in [Theme::Dark, Theme::Light] {
                let chart = renderer.render_chart(&request(hourly(48), style, theme)).unwrap();
                let decoded = image::load_from_memory(&chart.png).unwrap();
                assert_eq!((decoded.width(), decoded.height()), (640, 320));
                assert_eq!(chart.points_plotted, 48);
            }
        }
    }

    #[test]
    fn empty_series_is_invalid_input() {
        let renderer = ChartRenderer::default();
        let err = renderer
            .render(&request(Vec::new(), ChartStyle::Line, Theme::Dark))
            .unwrap_err();
        assert!(matches!(err, RenderError::InvalidInput(_)));
    }

    #[test]
    fn non_finite_values_are_invalid_input() {
        let renderer = ChartRenderer::default();
        let points = vec![TimeSeriesPoint::new(1700000000000, f64::NAN)];
        let err = renderer
            .render(&request(points, ChartStyle::Line, Theme::Dark))
            .unwrap_err();
        assert!(matches!(err, RenderError::InvalidInput(_)));
    }

    #[test]
    fn two_points_on_two_calendar_days() {
        let chart = ChartRenderer::default()
            .render_chart(&request(two_days(), ChartStyle::Line, Theme::Dark))
            .unwrap();
        assert_eq!(chart.points_plotted, 2);
        assert_eq!(chart.distinct_days, 2);
    }

    #[test]
    fn repeated_render_has_same_layout() {
        let renderer = ChartRenderer::new(800, 400);
        let req = request(hourly(100), ChartStyle::Area, Theme::Dark);
        let first = renderer.render_chart(&req).unwrap();
        let second = renderer.render_chart(&req).unwrap();

        assert_eq!((first.width, first.height), (second.width, second.height));
        assert_eq!(first.points_plotted, second.points_plotted);

        let a = image::load_from_memory(&first.png).unwrap().to_rgb8();
        let b = image::load_from_memory(&second.png).unwrap().to_rgb8();
        assert_eq!(a.dimensions(), b.dimensions());
        assert!(a.pixels().eq(b.pixels()));
    }

    #[test]
    fn theme_sets_background() {
        let renderer = ChartRenderer::new(400, 200);
        let dark = renderer
            .render(&request(two_days(), ChartStyle::Line, Theme::Dark))
            .unwrap();
        let light = renderer
            .render(&request(two_days(), ChartStyle::Line, Theme::Light))
            .unwrap();

        let dark = image::load_from_memory(&dark).unwrap().to_rgb8();
        let light = image::load_from_memory(&light).unwrap().to_rgb8();
        assert_eq!(dark.get_pixel(0, 0).0, [0x1f, 0x1f, 0x1f]);
        assert_eq!(light.get_pixel(0, 0).0, [0xff, 0xff, 0xff]);
    }

    #[test]
    fn line_color_reaches_the_canvas() {
        let png = ChartRenderer::new(600, 300)
            .render(&request(hourly(24), ChartStyle::Line, Theme::Dark))
            .unwrap();
        let img = image::load_from_memory(&png).unwrap().to_rgb8();
        let hits = img.pixels().filter(|p| p.0 == [0x00, 0xd8, 0xff]).count();
        assert!(hits > 0);
    }

    #[test]
    fn stroke_width_thickens_the_line() {
        let req = request(hourly(24), ChartStyle::Line, Theme::Dark);
        let line_pixels = |stroke: u32| {
            let png = ChartRenderer::new(600, 300)
                .with_stroke_width(stroke)
                .render(&req)
                .unwrap();
            let img = image::load_from_memory(&png).unwrap().to_rgb8();
            img.pixels().filter(|p| p.0 == [0x00, 0xd8, 0xff]).count()
        };

        let thin = line_pixels(1);
        let thick = line_pixels(4);
        assert!(thin > 0);
        assert!(thick > thin * 2, "{} vs {}", thick, thin);
    }

    #[test]
    fn single_point_and_flat_series_render() {
        let renderer = ChartRenderer::new(400, 200);
        let single = vec![TimeSeriesPoint::new(1700000000000, 1.0)];
        assert!(renderer.render(&request(single, ChartStyle::Scatter, Theme::Dark)).is_ok());

        let flat = vec![
            TimeSeriesPoint::new(1700000000000, 5.0),
            TimeSeriesPoint::new(1700003600000, 5.0),
        ];
        assert!(renderer.render(&request(flat, ChartStyle::Bar, Theme::Light)).is_ok());
    }

    #[test]
    fn large_series_renders_with_rotated_labels() {
        let renderer = ChartRenderer::new(1000, 500);
        assert!(renderer.x_label_count(2000) > ROTATE_X_LABELS_ABOVE);
        assert!(renderer
            .render(&request(hourly(2000), ChartStyle::Bar, Theme::Dark))
            .is_ok());
    }

    #[test]
    fn date_format_depends_on_span() {
        let intraday: Vec<_> = hourly(24)
            .iter()
            .map(|p| (p.datetime().unwrap(), p.value))
            .collect();
        let weekly: Vec<_> = hourly(24 * 7)
            .iter()
            .map(|p| (p.datetime().unwrap(), p.value))
            .collect();
        assert_eq!(date_format(&intraday), "%m-%d %H:%M");
        assert_eq!(date_format(&weekly), "%Y-%m-%d");
    }

    #[test]
    fn value_bounds_pad_flat_series() {
        let date = DateTime::from_timestamp_millis(0).unwrap();
        let (lo, hi) = value_bounds(&[(date, 10.0), (date, 10.0)], false);
        assert!(lo < 10.0 && hi > 10.0);

        let (lo, hi) = value_bounds(&[(date, 10.0), (date, 20.0)], true);
        assert_eq!(lo, 0.0);
        assert!(hi > 20.0);
    }

    #[test]
    fn compact_numbers() {
        assert_eq!(compact_number(1_250_000_000_000.0), "1.25T");
        assert_eq!(compact_number(850_000_000.0), "850.00M");
        assert_eq!(compact_number(42_000.0), "42.00K");
        assert_eq!(compact_number(12.5), "12.50");
        assert_eq!(compact_number(0.000123), "0.000123");
        assert_eq!(compact_number(0.0), "0.00");
    }
}
