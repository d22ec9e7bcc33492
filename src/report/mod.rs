//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//!
//! - the pipeline code stays clean and testable
//! - output changes are localized (important for future snapshot tests)

use crate::domain::{ALL, DataSource, DayBatch, Metric, Selection, TimeSeries};
use crate::series::RegionFill;

/// Title-style label for the current selection ("United States",
/// "California", "Los Angeles, California", "Global").
pub fn region_label(selection: &Selection) -> String {
    if selection.county != ALL {
        return format!("{}, {}", selection.county, selection.state);
    }
    if selection.state != ALL {
        return selection.state.clone();
    }
    if selection.country == ALL {
        return "Global".to_string();
    }
    if selection.country == "US" {
        return "United States".to_string();
    }
    selection.country.clone()
}

/// Format the run summary (dataset stats + selection + latest value).
pub fn format_summary(
    source: DataSource,
    selection: &Selection,
    days: &[DayBatch],
    series: &TimeSeries,
) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "=== covid — {} ({}) ===\n",
        selection.metric.display_name(),
        region_label(selection),
    ));
    out.push_str(&format!("Source: {}\n", source.display_name()));
    if let (Some(first), Some(last)) = (days.first(), days.last()) {
        out.push_str(&format!(
            "Days: {} fetched | {}..{}\n",
            days.len(),
            first.date,
            last.date,
        ));
    }
    out.push_str(&format!(
        "Series: {} actual points{}\n",
        series.actual_len(),
        match series.len() - series.actual_len() {
            0 => String::new(),
            n => format!(" + {n} predicted ({})", selection.model.display_name()),
        },
    ));
    if let Some(last) = series.last_actual() {
        let value = last
            .value(selection.metric)
            .map(format_value)
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "Latest: {value} {} on {}\n",
            selection.metric.display_name(),
            last.date,
        ));
    }
    out.push('\n');

    out
}

/// Format the per-day table: date, value, and (optionally) the percent change
/// vs the previous day. Predicted rows are marked with `~`.
pub fn format_series_table(series: &TimeSeries, metric: Metric, show_deltas: bool) -> String {
    let mut out = String::new();

    for idx in 0..series.len() {
        let point = &series.points[idx];
        let value = point
            .value(metric)
            .map(format_value)
            .unwrap_or_else(|| "-".to_string());
        let marker = if point.predicted { "~" } else { " " };
        out.push_str(&format!("{} {} {:>12}", point.date, marker, value));

        if show_deltas {
            if let Some(delta) = series.delta_percent(idx, metric) {
                out.push_str(&format!("  {delta:+}%"));
            }
        }
        out.push('\n');
    }

    out
}

/// Format the choropleth table: state, latest value, and a fill bar scaled by
/// the region's ratio to the quarter-of-national threshold.
pub fn format_map(fills: &[RegionFill], metric: Metric) -> String {
    let mut out = String::new();
    out.push_str(&format!("Latest {} by state:\n", metric.display_name()));

    let bar_width = 20usize;
    for fill in fills {
        let filled = (fill.ratio * bar_width as f64).round() as usize;
        out.push_str(&format!(
            "{:<24} {:>12} {}{}\n",
            fill.name,
            format_value(fill.latest),
            "#".repeat(filled.min(bar_width)),
            " ".repeat(bar_width - filled.min(bar_width)),
        ));
    }

    out
}

/// Format a plain sorted list of region names.
pub fn format_regions(keys: &[String]) -> String {
    let mut out = String::new();
    for key in keys {
        out.push_str(key);
        out.push('\n');
    }
    out
}

/// Whole-valued rendering for counts; `-` upstream handles non-finite.
pub fn format_value(v: f64) -> String {
    format!("{}", v as i64)
}
