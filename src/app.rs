//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - fetches the reference table and the selected data source(s)
//! - derives the selected series
//! - prints reports/plots or hands off to the TUI
//! - writes optional exports

use clap::Parser;

use crate::cli::{Command, ExportArgs, ExportFormat, MapArgs, RegionsArgs, ViewArgs};
use crate::domain::{KeyPart, Selection};
use crate::error::AppError;
use crate::series;

pub mod pipeline;

/// Entry point for the `covid` binary.
pub fn run() -> Result<(), AppError> {
    // We want `covid` and `covid --state Washington` to behave like
    // `covid tui ...`.
    //
    // Clap requires a subcommand name, so we do a small, explicit rewrite of
    // the argv list before parsing. This preserves a clean clap structure
    // while retaining the requested UX.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    // The TUI owns the terminal; logging would scribble over the alternate
    // screen, so it is only initialized for one-shot commands.
    if !matches!(cli.command, Command::Tui(_)) {
        pretty_env_logger::init_custom_env("RUST_LOG");
    }

    match cli.command {
        Command::Show(args) => handle_show(args),
        Command::Regions(args) => handle_regions(args),
        Command::Map(args) => handle_map(args),
        Command::Export(args) => handle_export(args),
        Command::Tui(args) => crate::tui::run(args),
    }
}

fn handle_show(args: ViewArgs) -> Result<(), AppError> {
    let (first, last) = args.fetch.range();
    let loaded = pipeline::load_dataset(args.fetch.source, first, last)?;
    let selection = selection_from_args(&args);

    let Some(view) = pipeline::derive_view(&loaded, &selection)? else {
        println!(
            "No matching records for {}.",
            crate::report::region_label(&selection)
        );
        return Ok(());
    };

    print!(
        "{}",
        crate::report::format_summary(loaded.source, &selection, &loaded.days, &view.series)
    );
    print!(
        "{}",
        crate::report::format_series_table(&view.series, selection.metric, selection.show_deltas)
    );
    println!();
    print!(
        "{}",
        crate::plot::render_series(
            &view.series,
            selection.metric,
            selection.log_scale,
            args.width,
            args.height,
        )
    );

    if let Some((name, compare)) = &view.compare {
        println!("\n--- compare: {name} ---");
        print!(
            "{}",
            crate::plot::render_series(
                compare,
                selection.metric,
                selection.log_scale,
                args.width,
                args.height,
            )
        );
    }

    Ok(())
}

fn handle_regions(args: RegionsArgs) -> Result<(), AppError> {
    let (first, last) = args.fetch.range();
    let loaded = pipeline::load_dataset(args.fetch.source, first, last)?;

    let keys = match (&args.country, &args.state) {
        (None, _) => series::list_keys(&loaded.days, KeyPart::Country),
        (Some(country), None) => {
            let filtered = series::filter_by_key(&loaded.days, KeyPart::Country, country);
            series::list_keys(&filtered, KeyPart::State)
        }
        (Some(country), Some(state)) => {
            let filtered = series::filter_by_key(&loaded.days, KeyPart::Country, country);
            let filtered = series::filter_by_key(&filtered, KeyPart::State, state);
            series::list_keys(&filtered, KeyPart::County)
        }
    };

    print!("{}", crate::report::format_regions(&keys));
    Ok(())
}

fn handle_map(args: MapArgs) -> Result<(), AppError> {
    let (first, last) = args.fetch.range();
    let loaded = pipeline::load_dataset(args.fetch.source, first, last)?;

    let fills = series::state_fills(&loaded.days, loaded.source, args.metric)?;
    if fills.is_empty() {
        println!("No state data to map.");
        return Ok(());
    }
    print!("{}", crate::report::format_map(&fills, args.metric));
    Ok(())
}

fn handle_export(args: ExportArgs) -> Result<(), AppError> {
    let (first, last) = args.view.fetch.range();
    let loaded = pipeline::load_dataset(args.view.fetch.source, first, last)?;
    let selection = selection_from_args(&args.view);

    let Some(view) = pipeline::derive_view(&loaded, &selection)? else {
        println!(
            "No matching records for {}; nothing exported.",
            crate::report::region_label(&selection)
        );
        return Ok(());
    };

    match args.format {
        ExportFormat::Csv => {
            crate::io::write_series_csv(&args.out, &view.series, loaded.source.metrics())?;
        }
        ExportFormat::Json => {
            let file = crate::io::SeriesFile::new(loaded.source, &selection, view.series);
            crate::io::write_series_json(&args.out, &file)?;
        }
    }
    println!("Wrote {}", args.out.display());
    Ok(())
}

/// Map view flags onto the derivation selection.
pub fn selection_from_args(args: &ViewArgs) -> Selection {
    Selection {
        country: args.country.clone(),
        state: args.state.clone(),
        county: args.county.clone(),
        metric: args.metric,
        horizon: args.predict,
        model: args.model,
        log_scale: args.log_scale,
        show_deltas: args.deltas,
        compare: args.compare.clone(),
    }
}

/// Rewrite argv so `covid` defaults to `covid tui`.
///
/// Rules:
/// - `covid`                        -> `covid tui`
/// - `covid --state Washington ...` -> `covid tui --state Washington ...`
/// - `covid --help/--version/-h`    -> unchanged (top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("tui".to_string());
        return argv;
    };

    let is_top_level_help_or_version =
        matches!(arg1.as_str(), "-h" | "--help" | "-V" | "--version" | "help");
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(
        arg1.as_str(),
        "show" | "regions" | "map" | "export" | "tui"
    );
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "tui flags".
    if arg1.starts_with('-') {
        argv.insert(1, "tui".to_string());
        return argv;
    }

    // Otherwise, leave as-is.
    argv
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_invocation_defaults_to_tui() {
        assert_eq!(rewrite_args(args(&["covid"])), args(&["covid", "tui"]));
        assert_eq!(
            rewrite_args(args(&["covid", "--state", "Washington"])),
            args(&["covid", "tui", "--state", "Washington"])
        );
    }

    #[test]
    fn subcommands_and_help_pass_through() {
        assert_eq!(
            rewrite_args(args(&["covid", "show", "--deltas"])),
            args(&["covid", "show", "--deltas"])
        );
        assert_eq!(rewrite_args(args(&["covid", "--help"])), args(&["covid", "--help"]));
    }
}
