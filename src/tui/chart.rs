//! Plotters-powered trend chart widget for Ratatui.
//!
//! Why Plotters instead of Ratatui's built-in `Chart` widget?
//! - nicer axis + mesh rendering
//! - less manual work for ticks/labels
//! - dashed series for predicted segments come for free
//!
//! We render Plotters output into the Ratatui buffer using
//! `plotters-ratatui-backend`.

use plotters::prelude::*;
use plotters_ratatui_backend::widget_fn;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

/// A lightweight, render-only chart description.
///
/// The widget is intentionally data-driven: all series and bounds are
/// computed outside the render call. This keeps `render()` focused on drawing
/// and makes the data prep testable on its own.
pub struct TrendChart<'a> {
    /// Line + point series for observed days.
    pub actual: &'a [(f64, f64)],
    /// Dashed tail for predicted days (starts at the last actual point).
    pub predicted: &'a [(f64, f64)],
    /// Optional second region overlay (comparison mode).
    pub compare: &'a [(f64, f64)],
    /// X bounds (days since the first plotted day).
    pub x_bounds: [f64; 2],
    /// Y bounds (metric value, possibly log10-transformed).
    pub y_bounds: [f64; 2],
    /// Axis labels (kept simple for terminal rendering).
    pub x_label: &'a str,
    pub y_label: String,
}

impl Widget for TrendChart<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // When the available area is too small, Plotters may fail to build a
        // chart. In that case, render a small hint rather than panicking.
        if area.width < 20 || area.height < 8 {
            buf.set_string(
                area.x,
                area.y,
                "Chart area too small (resize terminal).",
                Style::default().fg(Color::Yellow),
            );
            return;
        }

        let x0 = self.x_bounds[0];
        let x1 = self.x_bounds[1];
        let y0 = self.y_bounds[0];
        let y1 = self.y_bounds[1];

        if !(x0.is_finite() && x1.is_finite() && y0.is_finite() && y1.is_finite())
            || x1 <= x0
            || y1 <= y0
        {
            return;
        }

        let widget = widget_fn(move |root| {
            let mut chart = ChartBuilder::on(&root)
                .margin(1)
                // Terminal cells are low-res, so keep label areas compact.
                .set_label_area_size(LabelAreaPosition::Left, 8)
                .set_label_area_size(LabelAreaPosition::Bottom, 3)
                .build_cartesian_2d(x0..x1, y0..y1)?;

            chart
                .configure_mesh()
                .disable_x_mesh()
                .disable_y_mesh()
                .x_desc(self.x_label)
                .y_desc(&self.y_label)
                .x_labels(5)
                .y_labels(5)
                .x_label_formatter(&|v| format!("{v:.0}"))
                .y_label_formatter(&|v| format!("{v:.0}"))
                .label_style(("sans-serif", 10).into_font().color(&WHITE))
                .axis_style(&WHITE)
                .draw()?;

            let actual_color = RGBColor(0, 255, 255); // cyan
            let predicted_color = RGBColor(255, 255, 0); // yellow
            let compare_color = RGBColor(0, 255, 0); // green

            // 1) Observed line + point markers.
            chart.draw_series(LineSeries::new(self.actual.iter().copied(), &actual_color))?;
            chart.draw_series(self.actual.iter().map(|&(x, y)| Pixel::new((x, y), WHITE)))?;

            // 2) Predicted tail, dashed.
            if self.predicted.len() >= 2 {
                chart.draw_series(DashedLineSeries::new(
                    self.predicted.iter().copied(),
                    4,
                    3,
                    predicted_color.into(),
                ))?;
            }

            // 3) Comparison overlay.
            if self.compare.len() >= 2 {
                chart.draw_series(LineSeries::new(
                    self.compare.iter().copied(),
                    &compare_color,
                ))?;
            }

            Ok(())
        });

        widget.render(area, buf);
    }
}
