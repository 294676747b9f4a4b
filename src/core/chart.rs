//! Bar, line and pie charts over a record set.
//!
//! Charts are rendered as PNG and returned base64-encoded, or returned as
//! plain label/value points for a frontend to draw.
//!
//! # Limitations
//!
//! Text (title, axis labels, tick values) is not drawn on the image. Font
//! handling would pull in glyph rasterization and an embedded font; callers
//! that need labels should request `output_format = "json"`.

use crate::core::frame::require_column;
use crate::domain::model::Record;
use crate::utils::error::{AnalyticsError, Result};
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, NaiveDate};
use image::{ImageBuffer, ImageEncoder, Rgb, RgbImage};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_filled_rect_mut, draw_line_segment_mut, draw_polygon_mut,
};
use imageproc::point::Point;
use imageproc::rect::Rect;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const AXIS: Rgb<u8> = Rgb([90, 90, 90]);
const GRID: Rgb<u8> = Rgb([225, 225, 225]);
const MARGIN: u32 = 60;
const GRID_LINES: u32 = 5;

/// 圓餅圖用的柔和色盤
const PASTEL: [Rgb<u8>; 8] = [
    Rgb([161, 201, 244]),
    Rgb([255, 180, 130]),
    Rgb([141, 229, 161]),
    Rgb([255, 159, 155]),
    Rgb([208, 187, 255]),
    Rgb([222, 187, 155]),
    Rgb([250, 176, 228]),
    Rgb([207, 207, 207]),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Line,
    Pie,
}

impl ChartKind {
    fn default_title(&self) -> &'static str {
        match self {
            ChartKind::Bar => "Bar chart",
            ChartKind::Line => "Trend",
            ChartKind::Pie => "Distribution",
        }
    }

    fn default_color(&self) -> Rgb<u8> {
        match self {
            ChartKind::Bar => named_color("skyblue"),
            ChartKind::Line => named_color("green"),
            ChartKind::Pie => PASTEL[0],
        }
    }

    fn size(&self) -> (u32, u32) {
        match self {
            ChartKind::Pie => (800, 800),
            _ => (1000, 600),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Image,
    Json,
}

impl FromStr for OutputFormat {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "image" => Ok(Self::Image),
            "json" => Ok(Self::Json),
            other => Err(AnalyticsError::validation(format!(
                "Output format '{}' is not supported. Use 'image' or 'json'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartInput {
    pub data: Vec<Record>,
    pub x_col: String,
    pub y_col: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub output_format: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    pub chart_type: ChartKind,
    pub title: String,
    pub x_col: String,
    pub y_col: String,
    pub points: Vec<ChartPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChartOutput {
    Image { image_base64: String },
    Json(ChartData),
}

fn named_color(name: &str) -> Rgb<u8> {
    parse_color(name).unwrap_or(AXIS)
}

/// 色名或 `#RRGGBB`
pub fn parse_color(raw: &str) -> Option<Rgb<u8>> {
    let raw = raw.trim();
    if let Some(hex) = raw.strip_prefix('#') {
        if hex.len() != 6 {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        return Some(Rgb([channel(0)?, channel(2)?, channel(4)?]));
    }
    let rgb = match raw.to_lowercase().as_str() {
        "skyblue" => [135, 206, 235],
        "green" => [34, 139, 34],
        "red" => [214, 39, 40],
        "blue" => [31, 119, 180],
        "orange" => [255, 127, 14],
        "purple" => [148, 103, 189],
        "gray" | "grey" => [127, 127, 127],
        _ => return None,
    };
    Some(Rgb(rgb))
}

fn looks_like_date_column(name: &str) -> bool {
    let name = name.to_lowercase();
    ["date", "fecha", "time"].iter().any(|k| name.contains(k))
}

/// 將 ISO 日期／時間縮短為 YYYY-MM-DD；無法解析時原樣回傳
fn shorten_date(label: &str) -> String {
    if let Ok(dt) = DateTime::parse_from_rfc3339(label) {
        return dt.format("%Y-%m-%d").to_string();
    }
    label
        .get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| label.to_string())
}

fn collect_points(kind: ChartKind, data: &[Record], x_col: &str, y_col: &str) -> Vec<ChartPoint> {
    let date_axis = looks_like_date_column(x_col);
    let points = data.iter().map(|record| {
        let label = record
            .get(x_col)
            .map(|v| v.display_string())
            .unwrap_or_default();
        let label = if date_axis { shorten_date(&label) } else { label };
        // 無法轉為數值者視為 0
        let value = record.get(y_col).and_then(|v| v.as_f64()).unwrap_or(0.0);
        ChartPoint { label, value }
    });

    if kind != ChartKind::Pie {
        return points.collect();
    }

    let mut grouped: IndexMap<String, f64> = IndexMap::new();
    for point in points {
        *grouped.entry(point.label).or_insert(0.0) += point.value;
    }
    grouped
        .into_iter()
        .map(|(label, value)| ChartPoint { label, value })
        .collect()
}

pub fn render_chart(kind: ChartKind, input: &ChartInput) -> Result<ChartOutput> {
    require_column(&input.data, &input.x_col)?;
    require_column(&input.data, &input.y_col)?;
    let format: OutputFormat = input.output_format.as_deref().unwrap_or("image").parse()?;

    let points = collect_points(kind, &input.data, &input.x_col, &input.y_col);
    let title = input
        .title
        .clone()
        .unwrap_or_else(|| kind.default_title().to_string());
    tracing::debug!("Rendering {:?} chart '{}' with {} points", kind, title, points.len());

    match format {
        OutputFormat::Json => Ok(ChartOutput::Json(ChartData {
            chart_type: kind,
            title,
            x_col: input.x_col.clone(),
            y_col: input.y_col.clone(),
            points,
        })),
        OutputFormat::Image => {
            let color = input
                .color
                .as_deref()
                .and_then(parse_color)
                .unwrap_or_else(|| kind.default_color());
            let (width, height) = kind.size();
            let mut img: RgbImage = ImageBuffer::from_pixel(width, height, WHITE);

            match kind {
                ChartKind::Bar => draw_bars(&mut img, &points, color),
                ChartKind::Line => draw_line(&mut img, &points, color),
                ChartKind::Pie => draw_pie(&mut img, &points),
            }

            let png = encode_png(img)?;
            Ok(ChartOutput::Image {
                image_base64: general_purpose::STANDARD.encode(&png),
            })
        }
    }
}

fn encode_png(img: RgbImage) -> Result<Vec<u8>> {
    let (width, height) = img.dimensions();
    let mut buffer = Vec::new();
    image::codecs::png::PngEncoder::new(&mut buffer)
        .write_image(&img.into_raw(), width, height, image::ColorType::Rgb8)
        .map_err(|e| AnalyticsError::Chart {
            message: format!("PNG encoding failed: {}", e),
        })?;
    Ok(buffer)
}

/// 繪圖區範圍與數值 → 像素 y 座標的對應
struct Plot {
    left: f32,
    right: f32,
    top: f32,
    bottom: f32,
    min: f64,
    max: f64,
}

impl Plot {
    fn new(img: &RgbImage, points: &[ChartPoint]) -> Self {
        let (width, height) = img.dimensions();
        let mut min = points.iter().map(|p| p.value).fold(0.0, f64::min);
        let mut max = points.iter().map(|p| p.value).fold(0.0, f64::max);
        if (max - min).abs() < f64::EPSILON {
            min -= 1.0;
            max += 1.0;
        }
        Self {
            left: MARGIN as f32,
            right: (width - MARGIN) as f32,
            top: MARGIN as f32,
            bottom: (height - MARGIN) as f32,
            min,
            max,
        }
    }

    fn y_of(&self, value: f64) -> f32 {
        let ratio = ((value - self.min) / (self.max - self.min)) as f32;
        self.bottom - ratio * (self.bottom - self.top)
    }

    fn draw_frame(&self, img: &mut RgbImage) {
        for i in 0..=GRID_LINES {
            let y = self.top + (self.bottom - self.top) * i as f32 / GRID_LINES as f32;
            draw_line_segment_mut(img, (self.left, y), (self.right, y), GRID);
        }
        draw_line_segment_mut(img, (self.left, self.top), (self.left, self.bottom), AXIS);
        let zero = self.y_of(0.0);
        draw_line_segment_mut(img, (self.left, zero), (self.right, zero), AXIS);
    }
}

fn draw_bars(img: &mut RgbImage, points: &[ChartPoint], color: Rgb<u8>) {
    let plot = Plot::new(img, points);
    plot.draw_frame(img);
    if points.is_empty() {
        return;
    }

    let slot = (plot.right - plot.left) / points.len() as f32;
    let bar_width = (slot * 0.7).max(1.0);
    let zero = plot.y_of(0.0);

    for (i, point) in points.iter().enumerate() {
        let x = plot.left + slot * i as f32 + (slot - bar_width) / 2.0;
        let y = plot.y_of(point.value);
        let (top, bottom) = if y < zero { (y, zero) } else { (zero, y) };
        let rect = Rect::at(x.round() as i32, top.round() as i32)
            .of_size(bar_width.round().max(1.0) as u32, (bottom - top).round().max(1.0) as u32);
        draw_filled_rect_mut(img, rect, color);
    }
}

fn draw_line(img: &mut RgbImage, points: &[ChartPoint], color: Rgb<u8>) {
    let plot = Plot::new(img, points);
    plot.draw_frame(img);

    let step = if points.len() > 1 {
        (plot.right - plot.left) / (points.len() - 1) as f32
    } else {
        0.0
    };
    let coords: Vec<(f32, f32)> = points
        .iter()
        .enumerate()
        .map(|(i, p)| (plot.left + step * i as f32, plot.y_of(p.value)))
        .collect();

    for pair in coords.windows(2) {
        // 兩像素寬的線
        draw_line_segment_mut(img, pair[0], pair[1], color);
        draw_line_segment_mut(img, (pair[0].0, pair[0].1 + 1.0), (pair[1].0, pair[1].1 + 1.0), color);
    }
    for (x, y) in coords {
        draw_filled_circle_mut(img, (x.round() as i32, y.round() as i32), 4, color);
    }
}

fn draw_pie(img: &mut RgbImage, points: &[ChartPoint]) {
    let total: f64 = points.iter().map(|p| p.value.max(0.0)).sum();
    if total <= 0.0 {
        return;
    }

    let (width, height) = img.dimensions();
    let (cx, cy) = (width as f64 / 2.0, height as f64 / 2.0);
    let radius = (width.min(height) / 2 - MARGIN) as f64;
    // 從 140 度開始逆時針排列
    let mut angle = 140f64.to_radians();

    for (i, point) in points.iter().enumerate() {
        let share = point.value.max(0.0) / total;
        if share <= 0.0 {
            continue;
        }
        let sweep = share * std::f64::consts::TAU;
        let steps = ((sweep.to_degrees() / 2.0).ceil() as usize).max(2);

        let mut polygon = Vec::with_capacity(steps + 2);
        polygon.push(Point::new(cx.round() as i32, cy.round() as i32));
        for s in 0..=steps {
            let a = angle + sweep * s as f64 / steps as f64;
            let px = Point::new(
                (cx + radius * a.cos()).round() as i32,
                (cy - radius * a.sin()).round() as i32,
            );
            if polygon.last() != Some(&px) {
                polygon.push(px);
            }
        }
        if polygon.len() >= 3 && polygon.first() != polygon.last() {
            draw_polygon_mut(img, &polygon, PASTEL[i % PASTEL.len()]);
        }
        angle += sweep;
    }
}
