use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod applied;
mod chrome;
mod config;
mod countries;
mod diagnostics;
mod extract;
mod geocode;
mod paginate;
mod pipeline;
mod session;
mod settle;
mod sheet_name;
mod snapshot;
mod types;
mod utils;
mod workbook;

use chrome::ChromeSession;
use config::Config;
use geocode::NominatimGeocoder;
use pipeline::RunReport;
use session::PageSession;
use settle::{NoSettle, RandomizedSettle, SettlePolicy};
use snapshot::SnapshotSession;
use utils::osc8_file_link;

#[derive(Parser)]
#[command(name = "jobsheet")]
#[command(about = "Job listing harvester with country-partitioned workbook output")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Harvest the live listing with Chrome
    Run {
        #[command(flatten)]
        overrides: Overrides,
    },
    /// Re-run the pipeline over saved listing pages (*.html, in name order)
    Replay {
        #[arg(value_name = "DIR")]
        dir: PathBuf,

        #[command(flatten)]
        overrides: Overrides,
    },
    /// Remove the output workbook and logs directory
    Clean {
        #[command(flatten)]
        overrides: Overrides,
    },
}

#[derive(Args, Default)]
struct Overrides {
    /// JSON config file layered over the defaults
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output workbook
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Workbook or CSV listing already applied Job IDs
    #[arg(long, value_name = "FILE")]
    applied: Option<PathBuf>,

    #[arg(long, value_name = "DIR")]
    logs_dir: Option<PathBuf>,

    /// Chrome executable, when it is not found on the system
    #[arg(long, value_name = "FILE")]
    chrome_path: Option<PathBuf>,

    /// Run the browser without a window
    #[arg(long)]
    headless: bool,

    #[arg(long, value_name = "N")]
    records_per_page: Option<u32>,

    /// Also write the enriched records as JSON
    #[arg(long, value_name = "FILE")]
    dump: Option<PathBuf>,
}

impl Overrides {
    fn resolve(&self) -> Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;
        if let Some(output) = &self.output {
            config.output_path = output.clone();
        }
        if let Some(applied) = &self.applied {
            config.applied_path = applied.clone();
        }
        if let Some(logs_dir) = &self.logs_dir {
            config.logs_dir = logs_dir.clone();
        }
        if let Some(path) = &self.chrome_path {
            config.browser.binary = Some(path.clone());
        }
        if self.headless {
            config.browser.headless = true;
        }
        if let Some(n) = self.records_per_page {
            config.records_per_page = n;
        }
        Ok(config)
    }
}

/// Log to stderr and to `<logs_dir>/scraping.log`
fn init_logging(config: &Config) -> Result<()> {
    fs::create_dir_all(&config.logs_dir)
        .with_context(|| format!("Failed to create {}", config.logs_dir.display()))?;
    let log_path = config.log_file();
    let log_file = File::options()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open {}", log_path.display()))?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(log_file)),
        )
        .init();
    Ok(())
}

fn run_pipeline<S: PageSession>(
    session: S,
    settle: &dyn SettlePolicy,
    config: &Config,
    dump: Option<&Path>,
) -> Result<()> {
    let geocoder = NominatimGeocoder::new(&config.geocode)
        .context("Failed to build geocoding client")?;
    let report = pipeline::run(session, &geocoder, settle, config)?;
    print_report(&report);

    if let Some(path) = dump {
        let json = serde_json::to_string_pretty(&report.records)?;
        fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Records written to {}", path.display());
    }
    Ok(())
}

fn print_report(report: &RunReport) {
    if let Some(reason) = &report.aborted {
        println!("Run aborted: {}", reason);
        return;
    }
    println!(
        "Visited {} page(s), stopped: {:?}",
        report.pages_visited, report.stop
    );
    let (Some(summary), Some(path)) = (&report.written, &report.output_path) else {
        println!("No data to save.");
        return;
    };

    println!(
        "Saved {} rows to {} ({} of {} applied IDs excluded, {} cities)",
        summary.rows(),
        osc8_file_link(path, &path.display().to_string()),
        summary.excluded,
        report.applied,
        report.unique_cities
    );
    for sheet in &summary.sheets {
        if sheet.name == sheet.country {
            println!("  {:<31}  {:>4}", sheet.name, sheet.rows);
        } else {
            println!("  {:<31}  {:>4}  ({})", sheet.name, sheet.rows, sheet.country);
        }
    }
}

fn run_live(overrides: &Overrides) -> Result<()> {
    let config = overrides.resolve()?;
    init_logging(&config)?;
    let session =
        ChromeSession::start(&config.browser).context("Failed to start a Chrome session")?;
    run_pipeline(session, &RandomizedSettle, &config, overrides.dump.as_deref())
}

fn run_replay(dir: &Path, overrides: &Overrides) -> Result<()> {
    let config = overrides.resolve()?;
    init_logging(&config)?;
    let session = SnapshotSession::from_dir(dir, paginate::NEXT_SELECTOR)?;
    run_pipeline(session, &NoSettle, &config, overrides.dump.as_deref())
}

fn run_clean(overrides: &Overrides) -> Result<()> {
    let config = overrides.resolve()?;
    println!("Cleaning generated files...");

    if config.output_path.exists() {
        fs::remove_file(&config.output_path)?;
        println!("  Removed {}", config.output_path.display());
    }

    if config.logs_dir.exists() {
        fs::remove_dir_all(&config.logs_dir)?;
        println!("  Removed {}/", config.logs_dir.display());
    }

    println!("Clean complete!");
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { overrides } => run_live(&overrides),
        Commands::Replay { dir, overrides } => run_replay(&dir, &overrides),
        Commands::Clean { overrides } => run_clean(&overrides),
    }
}
