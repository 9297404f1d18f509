//! Processing-rate chart rendering.
//!
//! Draws one cumulative-count line per container on a shared time axis and
//! emits a standalone SVG document.

use crate::config::ChartConfig;
use crate::models::Timeline;
use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use std::fmt::Write as FmtWrite;
use std::path::Path;
use tracing::info;

const MARGIN_LEFT: f64 = 80.0;
const MARGIN_RIGHT: f64 = 200.0;
const MARGIN_TOP: f64 = 50.0;
const MARGIN_BOTTOM: f64 = 60.0;
const TICKS: usize = 5;
const DAY_MS: f64 = 86_400_000.0;

const PALETTE: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

/// Pixel geometry of the plotting area.
struct Frame {
    left: f64,
    top: f64,
    width: f64,
    height: f64,
    t_min: NaiveDateTime,
    t_span_ms: f64,
    y_max: f64,
}

impl Frame {
    fn new(config: &ChartConfig, timelines: &[Timeline]) -> Option<Self> {
        let stamps = timelines.iter().flat_map(|t| t.points.iter().map(|(ts, _)| *ts));
        let t_min = stamps.clone().min()?;
        let t_max = stamps.max()?;
        let y_max = timelines
            .iter()
            .filter_map(|t| t.points.last().map(|(_, c)| *c))
            .max()
            .unwrap_or(1)
            .max(1) as f64;

        // A single instant still gets a visible axis
        let t_span_ms = ((t_max - t_min).num_milliseconds() as f64).max(1000.0);

        Some(Self {
            left: MARGIN_LEFT,
            top: MARGIN_TOP,
            width: (config.width as f64 - MARGIN_LEFT - MARGIN_RIGHT).max(100.0),
            height: (config.height as f64 - MARGIN_TOP - MARGIN_BOTTOM).max(100.0),
            t_min,
            t_span_ms,
            y_max,
        })
    }

    fn x(&self, ts: NaiveDateTime) -> f64 {
        let ms = (ts - self.t_min).num_milliseconds() as f64;
        self.left + ms / self.t_span_ms * self.width
    }

    fn y(&self, count: f64) -> f64 {
        self.top + self.height - count / self.y_max * self.height
    }

    fn bottom(&self) -> f64 {
        self.top + self.height
    }

    fn right(&self) -> f64 {
        self.left + self.width
    }

    /// Time-of-day ticks repeat once the axis covers more than a day.
    fn tick_format(&self) -> &'static str {
        if self.t_span_ms > DAY_MS {
            "%m-%d %H:%M:%S"
        } else {
            "%H:%M:%S"
        }
    }
}

/// Render the chart as an SVG document.
pub fn render_svg(timelines: &[Timeline], config: &ChartConfig) -> String {
    let mut svg = String::new();
    let (w, h) = (config.width, config.height);

    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="sans-serif">"#
    );
    let _ = writeln!(svg, r#"<rect width="{w}" height="{h}" fill="white"/>"#);
    let _ = writeln!(
        svg,
        r#"<text x="{}" y="28" font-size="18" text-anchor="middle">{}</text>"#,
        w as f64 / 2.0,
        escape_xml(&config.title)
    );

    let Some(frame) = Frame::new(config, timelines) else {
        let _ = writeln!(
            svg,
            r##"<text x="{}" y="{}" font-size="14" text-anchor="middle" fill="#7f7f7f">No tasks processed</text>"##,
            w as f64 / 2.0,
            h as f64 / 2.0
        );
        svg.push_str("</svg>\n");
        return svg;
    };

    write_grid(&mut svg, &frame);
    write_axes(&mut svg, &frame);

    for (i, timeline) in timelines.iter().enumerate() {
        let color = PALETTE[i % PALETTE.len()];
        let points: Vec<String> = timeline
            .points
            .iter()
            .map(|(ts, count)| format!("{:.1},{:.1}", frame.x(*ts), frame.y(*count as f64)))
            .collect();

        if points.len() == 1 {
            let (ts, count) = timeline.points[0];
            let _ = writeln!(
                svg,
                r#"<circle cx="{:.1}" cy="{:.1}" r="3" fill="{color}"/>"#,
                frame.x(ts),
                frame.y(count as f64)
            );
        } else {
            let _ = writeln!(
                svg,
                r#"<polyline points="{}" fill="none" stroke="{color}" stroke-width="1.5" stroke-linejoin="round"/>"#,
                points.join(" ")
            );
        }
    }

    write_legend(&mut svg, &frame, timelines);

    svg.push_str("</svg>\n");
    svg
}

fn write_grid(svg: &mut String, frame: &Frame) {
    for i in 0..=TICKS {
        let frac = i as f64 / TICKS as f64;
        let x = frame.left + frac * frame.width;
        let y = frame.top + frac * frame.height;
        let _ = writeln!(
            svg,
            r##"<line x1="{x:.1}" y1="{:.1}" x2="{x:.1}" y2="{:.1}" stroke="#dddddd" stroke-width="0.8"/>"##,
            frame.top,
            frame.bottom()
        );
        let _ = writeln!(
            svg,
            r##"<line x1="{:.1}" y1="{y:.1}" x2="{:.1}" y2="{y:.1}" stroke="#dddddd" stroke-width="0.8"/>"##,
            frame.left,
            frame.right()
        );
    }
}

fn write_axes(svg: &mut String, frame: &Frame) {
    let _ = writeln!(
        svg,
        r#"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="none" stroke="black" stroke-width="1"/>"#,
        frame.left, frame.top, frame.width, frame.height
    );

    let tick_format = frame.tick_format();
    for i in 0..=TICKS {
        let frac = i as f64 / TICKS as f64;

        let offset_ms = (frac * frame.t_span_ms) as i64;
        let ts = frame.t_min + chrono::Duration::milliseconds(offset_ms);
        let _ = writeln!(
            svg,
            r#"<text x="{:.1}" y="{:.1}" font-size="11" text-anchor="middle">{}</text>"#,
            frame.left + frac * frame.width,
            frame.bottom() + 18.0,
            ts.format(tick_format)
        );

        let value = frac * frame.y_max;
        let _ = writeln!(
            svg,
            r#"<text x="{:.1}" y="{:.1}" font-size="11" text-anchor="end">{:.0}</text>"#,
            frame.left - 8.0,
            frame.y(value) + 4.0,
            value
        );
    }

    let _ = writeln!(
        svg,
        r#"<text x="{:.1}" y="{:.1}" font-size="13" text-anchor="middle">Time</text>"#,
        frame.left + frame.width / 2.0,
        frame.bottom() + 45.0
    );
    let cy = frame.top + frame.height / 2.0;
    let _ = writeln!(
        svg,
        r#"<text x="20" y="{cy:.1}" font-size="13" text-anchor="middle" transform="rotate(-90 20 {cy:.1})">Cumulative Tasks Processed</text>"#
    );
}

fn write_legend(svg: &mut String, frame: &Frame, timelines: &[Timeline]) {
    let x = frame.right() + 20.0;
    for (i, timeline) in timelines.iter().enumerate() {
        let y = frame.top + 10.0 + i as f64 * 20.0;
        let color = PALETTE[i % PALETTE.len()];
        let _ = writeln!(
            svg,
            r#"<line x1="{x:.1}" y1="{y:.1}" x2="{:.1}" y2="{y:.1}" stroke="{color}" stroke-width="2"/>"#,
            x + 24.0
        );
        let _ = writeln!(
            svg,
            r#"<text x="{:.1}" y="{:.1}" font-size="12">{}</text>"#,
            x + 30.0,
            y + 4.0,
            escape_xml(&timeline.label)
        );
    }
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Render and write the chart, creating parent directories as needed.
pub fn write_chart(path: &Path, timelines: &[Timeline], config: &ChartConfig) -> Result<()> {
    let svg = render_svg(timelines, config);

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create chart directory {}", parent.display()))?;
    }
    std::fs::write(path, svg)
        .with_context(|| format!("Failed to write chart to {}", path.display()))?;

    info!("Chart written to {}", path.display());
    Ok(())
}
