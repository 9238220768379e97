//! callscan CLI entry point

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use callscan_core::config::{AnalysisConfig, DescriberConfig};
use callscan_core::describe::FunctionDescriber;
use callscan_core::report::{load_results, save_results, write_html_report};
use callscan_core::runner::ProjectAnalyzer;

/// Call graph and code-issue scanner for Python projects
#[derive(Parser, Debug)]
#[command(name = "callscan")]
#[command(version)]
struct Cli {
    /// Show debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze a project directory and write the results as JSON
    Analyze {
        /// Project root to scan
        #[arg(value_name = "PATH")]
        path: PathBuf,

        /// Results file
        #[arg(short, long, default_value = "analysis_results.json")]
        output: PathBuf,

        /// Also render an HTML report to this file
        #[arg(long, value_name = "FILE")]
        html: Option<PathBuf>,

        /// Ask the description service to describe every function
        #[arg(long)]
        describe: bool,

        /// Description model; must be one of `callscan models`
        #[arg(long, env = "LLM_MODEL")]
        model: Option<String>,

        /// Skip files larger than this many bytes
        #[arg(long, env = "CALLSCAN_MAX_FILE_SIZE")]
        max_file_size: Option<u64>,

        /// Extraction worker threads
        #[arg(long, env = "CALLSCAN_WORKERS")]
        workers: Option<usize>,
    },

    /// Render an HTML report from a saved results file
    Report {
        #[arg(value_name = "RESULTS")]
        results: PathBuf,
        #[arg(value_name = "OUT")]
        output: PathBuf,
    },

    /// List the selectable description models
    Models,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Describer settings for `analyze --describe`; the model is only checked
/// when descriptions are requested.
fn describer_config(model: Option<&str>) -> anyhow::Result<DescriberConfig> {
    let mut config = DescriberConfig::from_env();
    if let Some(model) = model {
        config = config.with_model(model)?;
    }
    if !config.has_api_key() {
        bail!("--describe needs OPENROUTER_API_KEY to be set");
    }
    Ok(config)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Analyze {
            path,
            output,
            html,
            describe,
            model,
            max_file_size,
            workers,
        } => {
            let mut analysis = AnalysisConfig::from_env();
            if let Some(size) = max_file_size {
                analysis.max_file_size = size;
            }
            if let Some(workers) = workers {
                analysis.workers = workers.max(1);
            }

            let describer = if describe {
                Some(FunctionDescriber::new(describer_config(model.as_deref())?))
            } else {
                None
            };

            let analyzer = ProjectAnalyzer::new(analysis);
            let results = analyzer
                .analyze_project(&path, describer.as_ref(), &mut |message, progress| {
                    info!("[{progress:>5.1}%] {message}");
                })
                .with_context(|| format!("analysis of {} failed", path.display()))?;

            save_results(&results, &output)?;
            if let Some(html) = html {
                write_html_report(&results, &html)?;
            }

            let stats = &results.stats;
            println!(
                "{} files, {} functions, {} classes: {} errors, {} warnings, {} info",
                stats.total_files,
                stats.total_functions,
                stats.total_classes,
                stats.errors,
                stats.warnings,
                stats.info
            );
            println!("Results written to {}", output.display());
        }
        Command::Report { results, output } => {
            let loaded = load_results(&results)
                .with_context(|| format!("cannot load {}", results.display()))?;
            write_html_report(&loaded, &output)?;
            println!("HTML report generated: {}", output.display());
        }
        Command::Models => {
            let config = DescriberConfig::from_env();
            for model in &config.available_models {
                let marker = if *model == config.model { "*" } else { " " };
                println!("{marker} {model}");
            }
            if !config.has_api_key() {
                println!("(OPENROUTER_API_KEY is not set)");
            }
        }
    }
    Ok(())
}
