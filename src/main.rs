//! CLI entry point for the accessibility comparison tool.
//!
//! Each subcommand runs one stage against an analysis directory holding
//! `config.yml` and the input tables; `run` chains all of them.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use access_compare::analyzers::analyzer::{
    read_summary, run_all, run_compare, run_metrics, run_summary, run_unreachable,
    run_validation,
};
use access_compare::context::{RunContext, Workspace};
use access_compare::fetch::BasicClient;
use access_compare::output::{print_json, print_pretty};
use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "access_compare")]
#[command(about = "Compare transit accessibility across scenarios", long_about = None)]
struct Cli {
    /// Analysis directory containing config.yml
    #[arg(short, long, global = true, default_value = ".")]
    dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate, compute metrics, compare, summarize and count unreachable population
    Run,
    /// Check the input tables against each other and write zone lists to validation/
    Validate,
    /// Compute metrics{idx}.csv for every scenario
    Metrics,
    /// Build compared.csv from the metrics files
    Compare,
    /// Build summary.csv from compared.csv and the demographics
    Summarize,
    /// Build unreachable.csv from the metrics files and the demographics
    Unreachable,
    /// Print summary.csv
    Show {
        /// Use Rust debug formatting instead of JSON
        #[arg(long, default_value_t = false)]
        pretty: bool,
    },
}

/// Default stderr level from the config's `verbosity`; `RUST_LOG` still wins.
fn default_level(verbosity: Option<&str>) -> LevelFilter {
    match verbosity.map(str::to_ascii_uppercase).as_deref() {
        Some("DEBUG") => LevelFilter::DEBUG,
        Some("TRACE") => LevelFilter::TRACE,
        Some("WARNING") | Some("WARN") => LevelFilter::WARN,
        Some("ERROR") => LevelFilter::ERROR,
        _ => LevelFilter::INFO,
    }
}

/// Logging setup: colored stderr + JSON rolling log file.
fn init_logging(level: LevelFilter) -> tracing_appender::non_blocking::WorkerGuard {
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/access_compare.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("access_compare.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(
            EnvFilter::builder()
                .with_default_directive(level.into())
                .with_env_var("RUST_LOG")
                .from_env_lossy(),
        );

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::DEBUG.into())
                .with_env_var("RUST_LOG_JSON")
                .from_env_lossy(),
        );

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();
    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    let cli = Cli::parse();
    let workspace = Workspace::new(&cli.dir);
    let config = workspace.load_config()?;
    // the run span is created after the subscriber so it is recorded
    let _file_guard = init_logging(default_level(config.verbosity.as_deref()));
    let ctx = RunContext::new(config, workspace);

    info!(
        uid = %ctx.config.uid,
        dir = %cli.dir.display(),
        scenarios = ctx.scenario_count(),
        opportunities = ctx.config.opportunities.len(),
        "Configuration loaded"
    );
    for (idx, scenario) in ctx.config.scenarios.iter().enumerate() {
        let (start, end) = scenario.window();
        debug!(
            idx,
            name = %scenario.name,
            %start,
            %end,
            modes = ?scenario.transit_modes,
            "Scenario"
        );
    }

    let client = BasicClient::new();
    let report = match cli.command {
        Commands::Run => run_all(&ctx, &client).await?,
        Commands::Validate => run_validation(&ctx, &client).await?,
        Commands::Metrics => run_metrics(&ctx, &client).await?,
        Commands::Compare => run_compare(&ctx)?,
        Commands::Summarize => run_summary(&ctx, &client).await?,
        Commands::Unreachable => run_unreachable(&ctx, &client).await?,
        Commands::Show { pretty } => {
            let summary = read_summary(&ctx)?;
            let mut stdout = std::io::stdout().lock();
            if pretty {
                print_pretty(&mut stdout, &summary)?;
            } else {
                print_json(&mut stdout, &summary)?;
            }
            return Ok(());
        }
    };

    info!(warnings = report.len(), "Done");
    Ok(())
}
