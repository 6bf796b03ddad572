use std::{
    path::{Path, PathBuf},
    process::ExitCode,
    time::Instant,
};

use clap::Parser;
use core_model::VisitQuery;
use report::{DEFAULT_LIMIT, LimitPolicy, RenderedReport, ReportError, ReportGenerator};
use store_sqlite::SafariStore;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;

#[derive(Parser)]
#[command(name = "safari-visits")]
#[command(about = "How often and when you visited a web page in Safari")]
struct Cli {
    /// The URL of the web page you want to query, exactly as Safari stored it
    url: String,
    /// Maximum number of visits to show (default: 10, 0 shows all)
    #[arg(short, long, allow_negative_numbers = true)]
    max: Option<i64>,
    /// Read this History.db instead of Safari's
    #[arg(long)]
    db: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    match run(cli, &config::Config::default_path()) {
        Ok(report) => {
            print!("{report}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            match err.downcast_ref::<ReportError>() {
                Some(ReportError::InvalidArgument(msg)) => eprintln!("{msg}"),
                _ => eprintln!("error: {err:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli, config_path: &Path) -> anyhow::Result<RenderedReport> {
    // A negative --max is rejected even when the config file is broken.
    LimitPolicy::new(DEFAULT_LIMIT).resolve(cli.max)?;
    let config = config::Config::load_from(config_path)?;
    build_report(cli, &config)
}

fn build_report(cli: Cli, config: &config::Config) -> anyhow::Result<RenderedReport> {
    let t = Instant::now();
    let generator = ReportGenerator::new(config.report_config());
    let query = VisitQuery {
        url: cli.url,
        max_visits: cli.max,
    };
    let db = cli.db;
    let report = generator.generate(&query, || {
        let path = config.history_db(db)?;
        info!(path = %path.display(), "opening history db");
        SafariStore::open(&path)
    })?;
    info!(outcome = ?report.outcome, elapsed = ?t.elapsed(), "report ready");
    Ok(report)
}
