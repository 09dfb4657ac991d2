// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! go-instrument entry point - CLI, progress rendering, and interactive mode.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;

use go_instrument::config::{self, CliOptions, InstrumentConfig};
use go_instrument::diagnostics::DiagnosticSeverity;
use go_instrument::pipeline::{spawn_pipeline, Pipeline, ProgressEvent, RunReport, STEPS};
use go_instrument::syntax::{LoadOptions, PackageLoader};
use go_instrument::telemetry::{init_telemetry, TelemetryConfig};

/// Version string.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Exit code after Ctrl-C.
const INTERRUPTED: i32 = 130;

/// go-instrument - add New Relic instrumentation to a Go application as a patch.
#[derive(Parser)]
#[command(name = "go-instrument")]
#[command(author, version, about = "Add New Relic instrumentation to a Go application", long_about = None)]
struct Cli {
    /// Sub-paths to leave out (comma separated)
    #[arg(long, value_delimiter = ',', global = true)]
    exclude: Vec<String>,

    /// Show debug output and every diagnostic
    #[arg(short = 'D', long, global = true, env = "GO_INSTRUMENT_DEBUG")]
    debug: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Subcommands for go-instrument.
#[derive(Subcommand)]
enum Commands {
    /// Instrument the application at PATH and write a diff file
    Instrument {
        /// Workspace root (the directory holding go.mod)
        path: PathBuf,

        /// Package patterns to instrument (default: everything)
        patterns: Vec<String>,

        /// Output diff file, relative to PATH unless absolute
        #[arg(short, long)]
        output: Option<String>,

        /// Application name reported to New Relic
        #[arg(long, env = "NEW_RELIC_APP_NAME")]
        app_name: Option<String>,

        /// Do not create the agent in main
        #[arg(long)]
        no_bootstrap: bool,
    },

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("go-instrument {}", VERSION);
            Ok(())
        }
        Some(Commands::Instrument {
            path,
            patterns,
            output,
            app_name,
            no_bootstrap,
        }) => {
            let options = CliOptions {
                output,
                app_name,
                exclude: Some(cli.exclude),
                patterns: Some(patterns),
                no_bootstrap,
                debug: cli.debug,
            };
            let config = config::load_config(&path, options)?;
            let _guard = init_tracing(config.debug)?;
            instrument(path, config).await
        }
        None => {
            let root = std::env::current_dir()?;
            let options = CliOptions {
                exclude: Some(cli.exclude),
                debug: cli.debug,
                ..Default::default()
            };
            let config = config::load_config(&root, options)?;
            let _guard = init_tracing(config.debug)?;
            run_interactive(root, config).await
        }
    }
}

fn init_tracing(debug: bool) -> std::io::Result<go_instrument::telemetry::TelemetryGuard> {
    let config = if debug {
        TelemetryConfig::debug()
    } else {
        TelemetryConfig::default()
    };
    init_telemetry(&config)
}

/// List the Go files that would be analyzed and ask before running.
async fn run_interactive(root: PathBuf, config: InstrumentConfig) -> anyhow::Result<()> {
    let loader = PackageLoader::new(
        &root,
        LoadOptions {
            patterns: config.patterns.clone(),
            exclude: config.exclude.clone(),
        },
    )?;
    let files = loader.discover()?;
    if files.is_empty() {
        println!("{}", "No Go files found in the current directory.".yellow());
        return Ok(());
    }

    println!("{}", "Go files to analyze:".bright_blue().bold());
    for (relative, _) in &files {
        println!("  {}", relative);
    }
    let output = go_instrument::pipeline::output_path(&root, &config);
    print!(
        "\nInstrument {} file(s) and write {}? [y/N] ",
        files.len(),
        output.display()
    );
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    if !matches!(answer.trim().to_lowercase().as_str(), "y" | "yes") {
        println!("{}", "Aborted.".dimmed());
        return Ok(());
    }
    instrument(root, config).await
}

async fn instrument(root: PathBuf, config: InstrumentConfig) -> anyhow::Result<()> {
    let debug = config.debug;
    let (tx, mut rx) = mpsc::channel::<ProgressEvent>(64);
    let handle = spawn_pipeline(Pipeline::new(&root, config), tx);

    let bar = ProgressBar::new(STEPS.len() as u64);
    bar.set_style(
        ProgressStyle::with_template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("=> "),
    );
    bar.enable_steady_tick(std::time::Duration::from_millis(120));

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Some(ProgressEvent::Step { index, name, .. }) => {
                    bar.set_position(index as u64);
                    bar.set_message(name);
                }
                Some(ProgressEvent::PackagesLoaded { packages, files }) => {
                    bar.println(format!("Loaded {} package(s), {} file(s)", packages, files));
                }
                Some(ProgressEvent::File { description, .. }) => {
                    bar.set_message(description);
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                bar.abandon_with_message("interrupted");
                eprintln!("{}", "Interrupted; no diff file was written.".yellow());
                std::process::exit(INTERRUPTED);
            }
        }
    }

    let result = handle.await?;
    match result {
        Ok(report) => {
            bar.finish_and_clear();
            print_report(&report, debug);
            Ok(())
        }
        Err(err) => {
            bar.abandon_with_message("failed");
            Err(err.into())
        }
    }
}

fn print_report(report: &RunReport, debug: bool) {
    println!(
        "{} {}",
        "Wrote".green().bold(),
        report.output_path.display()
    );
    println!(
        "  {} file(s) changed, {} function(s) gained a transaction parameter (+{} -{})",
        report.files_changed, report.functions_rewritten, report.lines_added, report.lines_removed
    );

    if report.files_changed > 0 {
        println!("\nTo apply the changes:");
        println!("  {}", apply_command(&report.output_path).bright_white());
    }
    if !report.required_modules.is_empty() {
        println!("\nThen add the required modules:");
        for module in &report.required_modules {
            println!("  {}", format!("go get {}", module).bright_white());
        }
    }

    if debug {
        if !report.diagnostics.is_empty() {
            println!("\n{}", "Diagnostics:".bright_blue().bold());
        }
        for diagnostic in &report.diagnostics {
            let line = diagnostic.format_line();
            match diagnostic.severity {
                DiagnosticSeverity::Error => println!("  {}", line.red()),
                DiagnosticSeverity::Warning => println!("  {}", line.yellow()),
                DiagnosticSeverity::Information => println!("  {}", line.dimmed()),
            }
        }
    } else {
        let warnings = report
            .diagnostics
            .iter()
            .filter(|d| d.severity != DiagnosticSeverity::Information)
            .count();
        if warnings > 0 {
            println!(
                "\n{}",
                format!("{} warning(s); rerun with --debug for details", warnings).yellow()
            );
        }
    }
}

fn apply_command(path: &Path) -> String {
    format!("git apply {}", path.display())
}
