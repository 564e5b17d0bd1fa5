//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and loads configuration
//! - sets up logging
//! - dispatches brand/model/curve/report commands
//! - launches the TUI

use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::cli::{BrandCommand, Cli, Command, CurveArgs, ModelCommand, ReportArgs, TuiArgs};
use crate::config::AppConfig;
use crate::error::{AppError, ErrorKind};
use crate::report::{MarkdownRenderer, Renderer, Revision, TitlePage};
use crate::store::SampleStore;

pub mod pipeline;

use pipeline::Workspace;

/// Entry point for the `fan` binary.
pub fn run() -> Result<(), AppError> {
    // `fan` and `fan --model X` behave like `fan tui ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = Cli::parse_from(argv);

    let config = AppConfig::from_env()?;
    init_tracing(&config, matches!(cli.command, Command::Tui(_)));

    let ws = Workspace::open(config, cli.db)?;
    match cli.command {
        Command::Brand(cmd) => handle_brand(&ws, cmd),
        Command::Model(cmd) => handle_model(&ws, cmd),
        Command::Curve(args) => handle_curve(&ws, args),
        Command::Report(args) => handle_report(&ws, args),
        Command::Tui(args) => handle_tui(&ws, args),
    }
}

/// Install the stderr `tracing` subscriber.
///
/// The filter comes from `FANDB_LOG`, then `RUST_LOG`. The TUI owns the
/// terminal, so it logs nothing unless a filter is set explicitly.
fn init_tracing(config: &AppConfig, tui: bool) {
    let default = if tui { "off" } else { "warn" };
    let filter = config
        .log_filter
        .as_deref()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(default));

    // Already installed (tests, embedding): keep the existing subscriber.
    if let Err(err) = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
    {
        debug!(error = %err, "tracing subscriber already set");
    }
}

fn handle_brand(ws: &Workspace, cmd: BrandCommand) -> Result<(), AppError> {
    let registry = ws.registry();
    match cmd {
        BrandCommand::List => print!("{}", crate::report::format::format_brands(&registry.list_brands()?)),
        BrandCommand::Add { name } => {
            let brand = registry.add_brand(&name)?;
            println!("Added brand '{}'.", brand.name);
        }
        BrandCommand::Rename { old, new } => {
            let brand = registry.rename_brand(&old, &new)?;
            println!("Renamed brand '{old}' to '{}'.", brand.name);
        }
        BrandCommand::Delete { name } => {
            registry.delete_brand(&name)?;
            println!("Deleted brand '{name}'.");
        }
    }
    Ok(())
}

fn handle_model(ws: &Workspace, cmd: ModelCommand) -> Result<(), AppError> {
    let registry = ws.registry();
    match cmd {
        ModelCommand::List => print!("{}", crate::report::format::format_models(&registry.list_models()?)),
        ModelCommand::Show { model } => {
            let model = registry.resolve(&model)?;
            let n_samples = ws.db.load_samples(model.id)?.len();
            let fit = ws.stored_fit(&model)?;
            print!(
                "{}",
                crate::report::format::format_model_detail(&model, n_samples, fit.as_ref())
            );
        }
        ModelCommand::Add(args) => {
            let model = registry.create_model(&args.spec(), args.model_number.as_deref())?;
            println!("Added fan model '{}'.", model.model_number);
        }
        ModelCommand::Update { model, fields } => {
            let current = registry.resolve(&model)?;
            let updated =
                registry.update_model(current.id, &fields.spec(), fields.model_number.as_deref())?;
            println!("Updated fan model '{}'.", updated.model_number);
        }
        ModelCommand::Delete { model } => {
            let current = registry.resolve(&model)?;
            registry.delete_model(current.id)?;
            println!("Deleted fan model '{}' with its samples and fit.", current.model_number);
        }
    }
    Ok(())
}

fn handle_curve(ws: &Workspace, args: CurveArgs) -> Result<(), AppError> {
    let model_number = match &args.model {
        Some(m) => m.clone(),
        None => crate::cli::picker::prompt_for_model(&ws.registry().list_models()?)?.model_number,
    };
    let mut session = ws.open_session(&model_number)?;

    if let Some(path) = &args.import {
        let imported = crate::io::read_samples_csv(path)?;
        for e in &imported.row_errors {
            eprintln!("{}:{}: {}", path.display(), e.line, e.message);
        }
        println!(
            "Imported {} row(s) ({} complete) from {}.",
            imported.rows.len(),
            imported.complete_rows(),
            path.display()
        );
        session.replace_rows(imported.rows);
    }
    for sample in &args.add {
        session.add_row(sample.flow_rate, sample.pressure);
    }
    let mut deletions = args.delete.clone();
    deletions.sort_unstable_by(|a, b| b.cmp(a));
    deletions.dedup();
    for index in deletions {
        session.delete_row(index)?;
    }

    println!("{}", crate::report::format::format_rows(session.rows()));

    let samples = session.samples();
    let mut degree = args.degree.unwrap_or(ws.config.default_degree);
    if args.advise {
        let advice = crate::fit::advise_degree(&samples)?;
        print!("{}", crate::report::format::format_advice(&advice));
        if args.degree.is_none() {
            degree = advice.best.degree;
        }
    }

    let result = if args.commit {
        let result = session.commit_fit(&ws.db, degree)?;
        println!("Saved {} sample(s) and the degree {degree} fit.", samples.len());
        Some(result)
    } else {
        match pipeline::preview(&session, degree)? {
            Ok(result) => Some(result),
            Err(message) => {
                eprintln!("{message}");
                None
            }
        }
    };

    if let Some(result) = &result {
        print!(
            "{}",
            crate::report::format::format_fit_summary(&session.model().model_number, result)
        );
        if !args.no_plot {
            let plot = crate::plot::render_ascii_plot(&samples, Some(result), args.width, args.height);
            println!("{plot}");
        }
    }

    if let Some(path) = &args.export_samples {
        crate::io::write_samples_csv(path, &samples)?;
        println!("Wrote samples to {}.", path.display());
    }
    if let Some(path) = &args.export_curve {
        let result = result.as_ref().ok_or_else(|| {
            AppError::new(
                ErrorKind::ValidationWarning.exit_code(),
                "No fitted curve to export.",
            )
        })?;
        crate::io::write_curve_json(path, &session.model().model_number, result)?;
        println!("Wrote curve to {}.", path.display());
    }

    if session.is_dirty() {
        println!("Edits were not saved. Re-run with --commit to store them.");
    }
    Ok(())
}

fn handle_report(ws: &Workspace, args: ReportArgs) -> Result<(), AppError> {
    let entries = ws.model_reports(&args.models)?;

    let title_page = TitlePage {
        title: args.title,
        project_name: args.project,
        project_number: args.project_number,
        doc_number: args.doc_number,
        customer: args.customer,
        prepared_by: args.prepared_by,
        revision: args.revision.clone(),
    };
    let revisions = vec![Revision {
        rev: args.revision,
        description: args.revision_note,
        originator: args.originator,
        reviewed: args.reviewed,
        engineer: args.engineer,
        date: chrono::Local::now().format("%Y-%m-%d").to_string(),
    }];

    let doc = crate::report::fan_model_report(title_page, revisions, &entries);
    let rendered = MarkdownRenderer.render(&doc);
    let written = rendered.write_to(&args.out).map_err(|e| {
        AppError::new(
            ErrorKind::Internal.exit_code(),
            format!("Failed to write report '{}': {e}", args.out.display()),
        )
    })?;

    for path in written {
        println!("Wrote {}", path.display());
    }
    Ok(())
}

fn handle_tui(ws: &Workspace, args: TuiArgs) -> Result<(), AppError> {
    crate::tui::run(ws, args)
}

/// Rewrite argv so `fan` defaults to `fan tui`.
///
/// Rules:
/// - `fan`                      -> `fan tui`
/// - `fan --model X ...`        -> `fan tui --model X ...`
/// - `fan --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("tui".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "brand" | "model" | "curve" | "report" | "tui");
    if is_subcommand {
        return argv;
    }

    // `--db PATH` is global; keep it in front and still default to the TUI.
    if arg1 == "--db" {
        let after_db = argv.get(3).map(String::as_str);
        let has_subcommand = matches!(after_db, Some("brand" | "model" | "curve" | "report" | "tui"));
        if !has_subcommand && argv.len() >= 3 {
            argv.insert(3, "tui".to_string());
        }
        return argv;
    }

    if arg1.starts_with('-') {
        argv.insert(1, "tui".to_string());
    }
    argv
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_invocation_opens_tui() {
        assert_eq!(rewrite_args(args(&["fan"])), args(&["fan", "tui"]));
        assert_eq!(
            rewrite_args(args(&["fan", "--model", "AXF-1"])),
            args(&["fan", "tui", "--model", "AXF-1"])
        );
    }

    #[test]
    fn subcommands_and_help_pass_through() {
        for argv in [
            args(&["fan", "--help"]),
            args(&["fan", "-V"]),
            args(&["fan", "curve", "AXF-1"]),
            args(&["fan", "brand", "list"]),
        ] {
            assert_eq!(rewrite_args(argv.clone()), argv);
        }
    }

    #[test]
    fn global_db_flag_keeps_its_position() {
        assert_eq!(
            rewrite_args(args(&["fan", "--db", "x.sqlite"])),
            args(&["fan", "--db", "x.sqlite", "tui"])
        );
        assert_eq!(
            rewrite_args(args(&["fan", "--db", "x.sqlite", "model", "list"])),
            args(&["fan", "--db", "x.sqlite", "model", "list"])
        );
        let parsed = Cli::parse_from(rewrite_args(args(&["fan", "--db", "x.sqlite"])));
        assert!(matches!(parsed.command, Command::Tui(_)));
    }
}
