//! Export a derived series to CSV or JSON.
//!
//! The export is meant to be easy to consume in spreadsheets or downstream
//! scripts. JSON is the "portable" representation: the selection that
//! produced the series plus every point (including predicted ones).

use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{DataSource, Metric, Selection, TimeSeries, TrendModel};
use crate::error::AppError;
use crate::report::format_value;

/// A saved series file (JSON schema).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesFile {
    pub tool: String,
    pub source: DataSource,
    pub region: String,
    pub metric: Metric,
    pub model: TrendModel,
    pub horizon: usize,
    pub series: TimeSeries,
}

impl SeriesFile {
    pub fn new(source: DataSource, selection: &Selection, mut series: TimeSeries) -> Self {
        // Non-finite predicted values have no JSON representation; omit them,
        // as renderers do.
        for point in &mut series.points {
            point.values.retain(|_, v| v.is_finite());
        }
        Self {
            tool: "covid".to_string(),
            source,
            region: crate::report::region_label(selection),
            metric: selection.metric,
            model: selection.model,
            horizon: selection.horizon,
            series,
        }
    }
}

/// Write one row per series point: date, each source metric, predicted flag.
pub fn write_series_csv(
    path: &Path,
    series: &TimeSeries,
    metrics: &[Metric],
) -> Result<(), AppError> {
    let mut file = File::create(path).map_err(|e| {
        AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display()))
    })?;

    let mut header = String::from("date");
    for metric in metrics {
        header.push(',');
        header.push_str(metric.display_name());
    }
    header.push_str(",predicted");
    writeln!(file, "{header}")
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV header: {e}")))?;

    for point in &series.points {
        let mut row = point.date.to_string();
        for &metric in metrics {
            row.push(',');
            if let Some(v) = point.value(metric) {
                row.push_str(&format_value(v));
            }
        }
        row.push(',');
        row.push_str(if point.predicted { "true" } else { "false" });
        writeln!(file, "{row}")
            .map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))?;
    }

    Ok(())
}

/// Write the series JSON file.
pub fn write_series_json(path: &Path, series_file: &SeriesFile) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| {
        AppError::new(2, format!("Failed to create export JSON '{}': {e}", path.display()))
    })?;
    serde_json::to_writer_pretty(file, series_file)
        .map_err(|e| AppError::new(2, format!("Failed to write export JSON: {e}")))?;
    Ok(())
}

/// Read a series JSON file back (round-trip consumers, tests).
pub fn read_series_json(path: &Path) -> Result<SeriesFile, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::new(2, format!("Failed to open series JSON '{}': {e}", path.display()))
    })?;
    let series_file: SeriesFile = serde_json::from_reader(file)
        .map_err(|e| AppError::new(2, format!("Invalid series JSON: {e}")))?;
    Ok(series_file)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::NaiveDate;

    use super::*;
    use crate::domain::{ALL, SeriesPoint};

    fn series() -> TimeSeries {
        let start = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
        TimeSeries {
            points: vec![
                SeriesPoint {
                    date: start,
                    values: BTreeMap::from([(Metric::Confirmed, 10.0), (Metric::Deaths, 1.0)]),
                    previous: 0,
                    predicted: false,
                },
                SeriesPoint {
                    date: start + chrono::Duration::days(1),
                    values: BTreeMap::from([(Metric::Confirmed, 15.0), (Metric::Deaths, f64::NAN)]),
                    previous: 0,
                    predicted: true,
                },
            ],
        }
    }

    fn selection() -> Selection {
        Selection {
            country: "US".to_string(),
            state: ALL.to_string(),
            county: ALL.to_string(),
            metric: Metric::Confirmed,
            horizon: 1,
            model: TrendModel::RatioAverage,
            log_scale: false,
            show_deltas: false,
            compare: None,
        }
    }

    #[test]
    fn csv_export_includes_metrics_and_predicted_flag() {
        let dir = std::env::temp_dir().join("covid-trends-test-csv");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("series.csv");

        write_series_csv(&path, &series(), &[Metric::Confirmed, Metric::Deaths]).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "date,confirmed,deaths,predicted");
        assert_eq!(lines[1], "2020-03-01,10,1,false");
        // Non-finite predicted deaths export as an empty cell.
        assert_eq!(lines[2], "2020-03-02,15,,true");
    }

    #[test]
    fn json_export_round_trips() {
        let dir = std::env::temp_dir().join("covid-trends-test-json");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("series.json");

        let original = SeriesFile::new(DataSource::Csse, &selection(), series());
        write_series_json(&path, &original).unwrap();
        let loaded = read_series_json(&path).unwrap();

        assert_eq!(loaded.region, "United States");
        assert_eq!(loaded.metric, Metric::Confirmed);
        assert_eq!(loaded.series.len(), 2);
        assert_eq!(loaded.series.value(0, Metric::Confirmed), Some(10.0));
    }
}
