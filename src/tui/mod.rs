//! Ratatui-based terminal UI.
//!
//! The TUI provides selection controls (country/state/county, metric,
//! prediction horizon, trend model, comparison state), toggles for log scale,
//! delta labels, and plot/map view, and renders the derived series as a chart
//! plus a recent-days table.
//!
//! The base dataset is fetched once (and on `r`) and never mutated; every
//! interaction re-derives the view, guarded by a cache key over the effective
//! inputs so rapid repeated interactions don't recompute needlessly.

use std::io;
use std::time::Duration;

use chrono::NaiveDate;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph},
};

use crate::app::pipeline::{self, DerivedView, LoadedData};
use crate::app::selection_from_args;
use crate::cli::ViewArgs;
use crate::domain::dates::days_between;
use crate::domain::{ALL, KeyPart, Metric, Selection, TimeSeries, TrendModel, ViewMode};
use crate::error::AppError;
use crate::report::{format_value, region_label};
use crate::series::{self, RegionFill};

mod chart;

use chart::TrendChart;

const COMPARE_NONE: &str = "(none)";
const MAX_HORIZON: usize = 42;

/// Start the TUI.
pub fn run(args: ViewArgs) -> Result<(), AppError> {
    // Fetch before entering the alternate screen so the progress message has
    // somewhere visible to go.
    eprintln!("Loading data ...");
    let (first, last) = args.fetch.range();
    let loaded = pipeline::load_dataset(args.fetch.source, first, last)?;

    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| AppError::new(4, format!("Failed to initialize terminal: {e}")))?;

    let mut app = App::new(&args, loaded);
    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::new(4, format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::new(4, format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

/// Selection fields adjustable with ←/→.
const FIELDS: [&str; 7] = [
    "Country", "State", "County", "Metric", "Predict", "Model", "Compare",
];

struct App {
    first: NaiveDate,
    last: NaiveDate,
    loaded: LoadedData,
    selection: Selection,
    mode: ViewMode,
    selected_field: usize,
    countries: Vec<String>,
    states: Vec<String>,
    counties: Vec<String>,
    current_key: String,
    view: Option<DerivedView>,
    fills: Vec<RegionFill>,
    status: String,
}

impl App {
    fn new(args: &ViewArgs, loaded: LoadedData) -> Self {
        let (first, last) = args.fetch.range();
        let mut app = Self {
            first,
            last,
            loaded,
            selection: selection_from_args(args),
            mode: ViewMode::Plot,
            selected_field: 0,
            countries: Vec::new(),
            states: Vec::new(),
            counties: Vec::new(),
            current_key: String::new(),
            view: None,
            fills: Vec::new(),
            status: String::new(),
        };
        app.rebuild_options();
        app.maybe_update();
        app.status = format!("Loaded {} days.", app.loaded.days.len());
        app
    }

    fn event_loop<B: ratatui::backend::Backend>(
        &mut self,
        terminal: &mut Terminal<B>,
    ) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::new(4, format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::new(4, format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::new(4, format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code)? {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn handle_key(&mut self, code: KeyCode) -> Result<bool, AppError> {
        match code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Up => {
                if self.selected_field > 0 {
                    self.selected_field -= 1;
                }
            }
            KeyCode::Down => {
                if self.selected_field < FIELDS.len() - 1 {
                    self.selected_field += 1;
                }
            }
            KeyCode::Left => self.adjust_field(-1),
            KeyCode::Right => self.adjust_field(1),
            KeyCode::Char('l') => {
                self.selection.log_scale = !self.selection.log_scale;
                self.maybe_update();
            }
            KeyCode::Char('d') => {
                self.selection.show_deltas = !self.selection.show_deltas;
                self.maybe_update();
            }
            KeyCode::Char('m') => {
                self.mode = match self.mode {
                    ViewMode::Plot => ViewMode::Map,
                    ViewMode::Map => ViewMode::Plot,
                };
                self.maybe_update();
            }
            KeyCode::Char('r') => self.refresh()?,
            _ => {}
        }

        Ok(false)
    }

    fn adjust_field(&mut self, delta: i32) {
        match self.selected_field {
            0 => {
                self.selection.country = cycle(&self.countries, &self.selection.country, delta);
                self.selection.state = ALL.to_string();
                self.selection.county = ALL.to_string();
                self.rebuild_dependent_options();
                self.status = format!("country: {}", self.selection.country);
            }
            1 => {
                self.selection.state = cycle(&self.states, &self.selection.state, delta);
                self.selection.county = ALL.to_string();
                self.rebuild_dependent_options();
                self.status = format!("state: {}", self.selection.state);
            }
            2 => {
                self.selection.county = cycle(&self.counties, &self.selection.county, delta);
                self.status = format!("county: {}", self.selection.county);
            }
            3 => {
                let metrics: Vec<String> = self
                    .loaded
                    .source
                    .metrics()
                    .iter()
                    .map(|m| m.display_name().to_string())
                    .collect();
                let next = cycle(&metrics, self.selection.metric.display_name(), delta);
                if let Some(metric) = self
                    .loaded
                    .source
                    .metrics()
                    .iter()
                    .find(|m| m.display_name() == next)
                {
                    self.selection.metric = *metric;
                }
                self.status = format!("metric: {}", self.selection.metric.display_name());
            }
            4 => {
                let horizon = self.selection.horizon as i64 + 7 * delta as i64;
                self.selection.horizon = horizon.clamp(0, MAX_HORIZON as i64) as usize;
                self.status = format!("predict: {} days", self.selection.horizon);
            }
            5 => {
                self.selection.model = match self.selection.model {
                    TrendModel::RatioAverage => TrendModel::ExpRegression,
                    TrendModel::ExpRegression => TrendModel::RatioAverage,
                };
                self.status = format!("model: {}", self.selection.model.display_name());
            }
            6 => {
                let mut options = vec![COMPARE_NONE.to_string()];
                options.extend(self.states.iter().filter(|s| *s != ALL).cloned());
                let current = self.selection.compare.as_deref().unwrap_or(COMPARE_NONE);
                let next = cycle(&options, current, delta);
                self.selection.compare = (next != COMPARE_NONE).then_some(next.clone());
                self.status = format!("compare: {next}");
            }
            _ => {}
        }
        self.maybe_update();
    }

    /// Re-derive the view, but only when the effective inputs changed.
    fn maybe_update(&mut self) {
        let key = format!("{}|{:?}", self.selection.cache_key(), self.mode);
        if key == self.current_key {
            return;
        }
        self.current_key = key;

        match pipeline::derive_view(&self.loaded, &self.selection) {
            Ok(view) => {
                if view.is_none() {
                    self.status =
                        format!("No matching records for {}.", region_label(&self.selection));
                }
                self.view = view;
            }
            Err(e) => {
                self.status = e.to_string();
                self.view = None;
            }
        }

        if self.mode == ViewMode::Map {
            match series::state_fills(&self.loaded.days, self.loaded.source, self.selection.metric)
            {
                Ok(fills) => self.fills = fills,
                Err(e) => {
                    self.status = e.to_string();
                    self.fills = Vec::new();
                }
            }
        }
    }

    fn refresh(&mut self) -> Result<(), AppError> {
        self.status = "Loading data ...".to_string();
        self.loaded = pipeline::load_dataset(self.loaded.source, self.first, self.last)?;
        self.rebuild_options();
        self.current_key.clear();
        self.maybe_update();
        self.status = format!("Loaded {} days.", self.loaded.days.len());
        Ok(())
    }

    fn rebuild_options(&mut self) {
        self.countries = with_all(series::list_keys(&self.loaded.days, KeyPart::Country));
        if !self.countries.contains(&self.selection.country) {
            self.selection.country = ALL.to_string();
        }
        self.rebuild_dependent_options();
        if !self.states.contains(&self.selection.state) {
            self.selection.state = ALL.to_string();
        }
        if !self.counties.contains(&self.selection.county) {
            self.selection.county = ALL.to_string();
        }
    }

    /// Recompute the state/county option lists from the current parents.
    fn rebuild_dependent_options(&mut self) {
        let by_country =
            series::filter_by_key(&self.loaded.days, KeyPart::Country, &self.selection.country);
        self.states = with_all(series::list_keys(&by_country, KeyPart::State));

        let by_state = series::filter_by_key(&by_country, KeyPart::State, &self.selection.state);
        self.counties = with_all(series::list_keys(&by_state, KeyPart::County));
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(5),
                Constraint::Min(0),
                Constraint::Length(9),
                Constraint::Length(3),
            ])
            .split(size);

        self.draw_header(frame, chunks[0]);
        self.draw_body(frame, chunks[1]);
        self.draw_settings(frame, chunks[2]);
        self.draw_footer(frame, chunks[3]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let mut lines: Vec<Line> = Vec::new();
        lines.push(Line::from(vec![
            Span::styled("covid", Style::default().fg(Color::Cyan)),
            Span::raw(format!(
                " — {} ({})",
                self.selection.metric.display_name(),
                region_label(&self.selection),
            )),
        ]));

        let range = match (self.loaded.days.first(), self.loaded.days.last()) {
            (Some(first), Some(last)) => format!("{}..{}", first.date, last.date),
            _ => "-".to_string(),
        };
        lines.push(Line::from(Span::styled(
            format!(
                "source: {} | days: {} | {range} | model: {} | predict: {}",
                self.loaded.source.display_name(),
                self.loaded.days.len(),
                self.selection.model.display_name(),
                self.selection.horizon,
            ),
            Style::default().fg(Color::Gray),
        )));

        if let Some(view) = &self.view {
            if let Some(last) = view.series.last_actual() {
                let value = last
                    .value(self.selection.metric)
                    .map(format_value)
                    .unwrap_or_else(|| "-".to_string());
                let mut spans = vec![Span::styled(
                    format!("latest: {value} on {}", last.date),
                    Style::default().fg(Color::Gray),
                )];
                let idx = view.series.actual_len().saturating_sub(1);
                if let Some(delta) = view.series.delta_percent(idx, self.selection.metric) {
                    let color = if delta > 0 { Color::Red } else { Color::Green };
                    spans.push(Span::styled(
                        format!("  {delta:+}%"),
                        Style::default().fg(color),
                    ));
                }
                lines.push(Line::from(spans));
            }
        }

        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        match self.mode {
            ViewMode::Plot => {
                let chunks = Layout::default()
                    .direction(Direction::Horizontal)
                    .constraints([Constraint::Min(0), Constraint::Length(34)])
                    .split(area);
                self.draw_chart(frame, chunks[0]);
                self.draw_recent(frame, chunks[1]);
            }
            ViewMode::Map => self.draw_map(frame, area),
        }
    }

    fn draw_chart(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default().title("Trend").borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        let Some(data) = self
            .view
            .as_ref()
            .and_then(|view| chart_data(view, self.selection.metric, self.selection.log_scale))
        else {
            let msg = Paragraph::new("Nothing to plot for this selection.")
                .style(Style::default().fg(Color::Yellow))
                .block(Block::default());
            frame.render_widget(msg, inner);
            return;
        };

        let widget = TrendChart {
            actual: &data.actual,
            predicted: &data.predicted,
            compare: &data.compare,
            x_bounds: data.x_bounds,
            y_bounds: data.y_bounds,
            x_label: "days",
            y_label: data.y_label,
        };
        frame.render_widget(widget, inner);
    }

    fn draw_recent(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default().title("Recent days").borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let Some(view) = &self.view else {
            return;
        };
        let series = &view.series;

        let rows = inner.height as usize;
        let start = series.len().saturating_sub(rows);

        let mut items: Vec<ListItem> = Vec::new();
        for idx in start..series.len() {
            let point = &series.points[idx];
            let value = point
                .value(self.selection.metric)
                .map(format_value)
                .unwrap_or_else(|| "-".to_string());

            let mut spans = vec![
                Span::styled(
                    format!("{}{}", point.date, if point.predicted { "~" } else { " " }),
                    Style::default().fg(if point.predicted {
                        Color::Yellow
                    } else {
                        Color::Gray
                    }),
                ),
                Span::raw(format!(" {value:>10}")),
            ];
            if self.selection.show_deltas {
                if let Some(delta) = series.delta_percent(idx, self.selection.metric) {
                    let color = if delta > 0 { Color::Red } else { Color::Green };
                    spans.push(Span::styled(
                        format!(" {delta:+}%"),
                        Style::default().fg(color),
                    ));
                }
            }
            items.push(ListItem::new(Line::from(spans)));
        }

        frame.render_widget(List::new(items), inner);
    }

    fn draw_map(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default()
            .title(format!(
                "Latest {} by state",
                self.selection.metric.display_name()
            ))
            .borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        if self.fills.is_empty() {
            let msg = Paragraph::new("No state data to map.")
                .style(Style::default().fg(Color::Yellow));
            frame.render_widget(msg, inner);
            return;
        }

        let bar_width = 24usize;
        let mut lines: Vec<Line> = Vec::new();
        for fill in self.fills.iter().take(inner.height as usize) {
            let filled = ((fill.ratio * bar_width as f64).round() as usize).min(bar_width);
            lines.push(Line::from(vec![
                Span::raw(format!(
                    "{:<24} {:>12} ",
                    fill.name,
                    format_value(fill.latest)
                )),
                Span::styled("█".repeat(filled), Style::default().fg(fill_color(fill.ratio))),
            ]));
        }

        frame.render_widget(Paragraph::new(Text::from(lines)), inner);
    }

    fn draw_settings(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let values = [
            self.selection.country.clone(),
            self.selection.state.clone(),
            self.selection.county.clone(),
            self.selection.metric.display_name().to_string(),
            format!("{} days", self.selection.horizon),
            self.selection.model.display_name().to_string(),
            self.selection
                .compare
                .clone()
                .unwrap_or_else(|| COMPARE_NONE.to_string()),
        ];

        let items: Vec<ListItem> = FIELDS
            .iter()
            .zip(values)
            .map(|(field, value)| ListItem::new(format!("{field}: {value}")))
            .collect();

        let list = List::new(items)
            .block(Block::default().title("Selection").borders(Borders::ALL))
            .highlight_style(Style::default().fg(Color::Black).bg(Color::White))
            .highlight_symbol("» ");

        let mut state = ratatui::widgets::ListState::default();
        state.select(Some(self.selected_field));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "↑/↓ select  ←/→ adjust  l log  d deltas  m map  r refresh  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

/// Cycle through an option list, wrapping at both ends.
fn cycle(options: &[String], current: &str, delta: i32) -> String {
    if options.is_empty() {
        return current.to_string();
    }
    let idx = options.iter().position(|o| o == current).unwrap_or(0) as i32;
    let n = options.len() as i32;
    options[(idx + delta).rem_euclid(n) as usize].clone()
}

fn with_all(keys: Vec<String>) -> Vec<String> {
    let mut out = vec![ALL.to_string()];
    out.extend(keys.into_iter().filter(|k| k != ALL));
    out
}

/// Green→red ramp for choropleth fills.
fn fill_color(ratio: f64) -> Color {
    let ratio = ratio.clamp(0.0, 1.0);
    Color::Rgb((255.0 * ratio) as u8, (200.0 * (1.0 - ratio)) as u8, 0)
}

struct ChartData {
    actual: Vec<(f64, f64)>,
    predicted: Vec<(f64, f64)>,
    compare: Vec<(f64, f64)>,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
    y_label: String,
}

/// Build chart series for Plotters.
///
/// X is days since the primary series' first day (mid-range gaps keep their
/// true spacing); Y is the metric value, log10-transformed on a log scale.
/// Values at or below the cutoff (10 on log, 0 on linear) and non-finite
/// predictions are omitted.
fn chart_data(view: &DerivedView, metric: Metric, log_scale: bool) -> Option<ChartData> {
    let origin = view.series.points.first()?.date;

    let points = series_xy(&view.series, metric, log_scale, origin);
    let actual: Vec<(f64, f64)> = points
        .iter()
        .filter(|p| !p.2)
        .map(|&(x, y, _)| (x, y))
        .collect();
    if actual.len() < 2 {
        return None;
    }

    // The dashed tail starts at the last actual point for a continuous line.
    let mut predicted: Vec<(f64, f64)> = Vec::new();
    if points.iter().any(|p| p.2) {
        if let Some(&last_actual) = actual.last() {
            predicted.push(last_actual);
        }
        predicted.extend(points.iter().filter(|p| p.2).map(|&(x, y, _)| (x, y)));
    }

    let compare: Vec<(f64, f64)> = view
        .compare
        .as_ref()
        .map(|(_, series)| {
            series_xy(series, metric, log_scale, origin)
                .into_iter()
                .map(|(x, y, _)| (x, y))
                .collect()
        })
        .unwrap_or_default();

    let all = actual
        .iter()
        .chain(&predicted)
        .chain(&compare)
        .copied()
        .collect::<Vec<_>>();
    let x_max = all.iter().map(|p| p.0).fold(1.0_f64, f64::max);
    let (mut y_min, mut y_max) = (f64::INFINITY, f64::NEG_INFINITY);
    for &(_, y) in &all {
        y_min = y_min.min(y);
        y_max = y_max.max(y);
    }
    if !y_min.is_finite() || !y_max.is_finite() || y_max <= y_min {
        y_min = 0.0;
        y_max = 1.0;
    }
    let pad = ((y_max - y_min).abs() * 0.05).max(1e-12);

    Some(ChartData {
        actual,
        predicted,
        compare,
        x_bounds: [0.0, x_max],
        y_bounds: [y_min - pad, y_max + pad],
        y_label: if log_scale {
            format!("log10({})", metric.display_name())
        } else {
            metric.display_name().to_string()
        },
    })
}

fn series_xy(
    series: &TimeSeries,
    metric: Metric,
    log_scale: bool,
    origin: NaiveDate,
) -> Vec<(f64, f64, bool)> {
    let cutoff = if log_scale { 10.0 } else { 0.0 };
    series
        .points
        .iter()
        .filter_map(|p| {
            let value = p.value(metric)?;
            if value <= cutoff {
                return None;
            }
            let y = if log_scale { value.log10() } else { value };
            Some((days_between(origin, p.date) as f64, y, p.predicted))
        })
        .collect()
}
