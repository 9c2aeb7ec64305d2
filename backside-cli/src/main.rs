//! Backside CLI: scan, parameter and calendar commands.
//!
//! Commands:
//! - `scan`: run the three-stage scan from a TOML config or flags, export signals
//! - `params`: print the default `[params]` table as TOML
//! - `calendar`: list the trading days between two dates

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use backside_core::data::{TradingCalendar, UsEquityCalendar};
use backside_core::observe::TracingObserver;
use backside_core::params::ScanParameters;
use backside_runner::{run_and_export, ExportFormat, ProviderConfig, ScanConfig, ScanReport};

#[derive(Parser)]
#[command(
    name = "backside",
    about = "Backside breakdown scanner over grouped daily bars"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Csv,
    Json,
    Both,
}

impl From<FormatArg> for ExportFormat {
    fn from(f: FormatArg) -> Self {
        match f {
            FormatArg::Csv => ExportFormat::Csv,
            FormatArg::Json => ExportFormat::Json,
            FormatArg::Both => ExportFormat::Both,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scan and export the signals.
    Scan {
        /// Path to a TOML scan config.
        #[arg(long)]
        config: Option<PathBuf>,

        /// First output date (YYYY-MM-DD). Overrides the config.
        #[arg(long)]
        start: Option<String>,

        /// Last output date (YYYY-MM-DD). Overrides the config.
        #[arg(long)]
        end: Option<String>,

        /// Use the seeded synthetic universe instead of the HTTP provider.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Seed for --synthetic.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Universe size for --synthetic.
        #[arg(long, default_value_t = 200)]
        tickers: usize,

        /// Output directory. Overrides the config.
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Export format. Overrides the config.
        #[arg(long, value_enum)]
        format: Option<FormatArg>,
    },
    /// Print the default scan parameters as TOML.
    Params,
    /// List trading days in a date range.
    Calendar {
        /// Start date (YYYY-MM-DD).
        #[arg(long)]
        start: String,

        /// End date (YYYY-MM-DD).
        #[arg(long)]
        end: String,

        /// Additional closure dates (YYYY-MM-DD), repeatable.
        #[arg(long = "closure")]
        closures: Vec<String>,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan {
            config,
            start,
            end,
            synthetic,
            seed,
            tickers,
            output_dir,
            format,
        } => run_scan_cmd(ScanArgs {
            config,
            start,
            end,
            synthetic: synthetic.then_some((seed, tickers)),
            output_dir,
            format,
        }),
        Commands::Params => run_params(),
        Commands::Calendar {
            start,
            end,
            closures,
        } => run_calendar(&start, &end, &closures),
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("invalid date '{s}'"))
}

struct ScanArgs {
    config: Option<PathBuf>,
    start: Option<String>,
    end: Option<String>,
    synthetic: Option<(u64, usize)>,
    output_dir: Option<PathBuf>,
    format: Option<FormatArg>,
}

fn build_scan_config(args: &ScanArgs) -> Result<ScanConfig> {
    let start = args.start.as_deref().map(parse_date).transpose()?;
    let end = args.end.as_deref().map(parse_date).transpose()?;

    let mut config = match (&args.config, start, end) {
        (Some(path), _, _) => ScanConfig::load(path)?,
        (None, Some(start), Some(end)) => ScanConfig::new(start, end),
        (None, _, _) => bail!("either --config or both --start and --end are required"),
    };

    if let Some(start) = start {
        config.scan.start = start;
    }
    if let Some(end) = end {
        config.scan.end = end;
    }
    if let Some((seed, tickers)) = args.synthetic {
        config.provider = ProviderConfig::synthetic(seed, tickers);
    }
    if let Some(dir) = &args.output_dir {
        config.output.dir = dir.clone();
    }
    if let Some(format) = args.format {
        config.output.format = format.into();
    }
    config.validate()?;
    Ok(config)
}

fn run_scan_cmd(args: ScanArgs) -> Result<()> {
    let config = build_scan_config(&args)?;
    let (report, written) = run_and_export(&config, &TracingObserver)?;

    print_summary(&report);
    for path in &written {
        println!("Wrote {}", path.display());
    }
    if !report.stats.ingest.all_succeeded() {
        warn!(
            failed = report.stats.ingest.days_failed,
            "some trading days could not be fetched; results may be incomplete"
        );
    }
    Ok(())
}

fn print_summary(report: &ScanReport) {
    let s = &report.stats;
    println!(
        "Scan {} .. {} via {} (run {})",
        report.output_start,
        report.output_end,
        report.provider,
        &report.run_id[..report.run_id.len().min(12)]
    );
    println!(
        "  days: {} requested, {} ok, {} failed; {} tickers, {} duplicate bars",
        s.ingest.days_requested,
        s.ingest.days_ok,
        s.ingest.days_failed,
        s.ingest.tickers,
        s.ingest.duplicates
    );
    println!(
        "  smart filter: {} of {} tickers kept, {} qualified D0 rows",
        s.filter.tickers_kept, s.filter.tickers_in, s.filter.qualified_rows
    );
    println!(
        "  detection: {} evaluated, {} skipped, {} failed",
        s.tickers_evaluated, s.tickers_skipped, s.tickers_failed
    );
    println!(
        "  timings: ingest {}ms, filter {}ms, detect {}ms",
        s.timings.ingest_ms, s.timings.smart_filter_ms, s.timings.detect_ms
    );
    println!("  signals: {}", s.signals);
    for sig in &report.signals {
        println!(
            "    {:<8} {} {:<4} pos={:.3} gap/atr={:.2} open/ema9={:.2}",
            sig.ticker,
            sig.date,
            sig.trigger.as_str(),
            sig.metrics.position,
            sig.metrics.gap_over_atr,
            sig.metrics.open_over_ema9
        );
    }
}

fn run_params() -> Result<()> {
    let toml = ScanParameters::default().to_toml_string()?;
    println!("[params]\n{toml}");
    Ok(())
}

fn run_calendar(start: &str, end: &str, closures: &[String]) -> Result<()> {
    let start = parse_date(start)?;
    let end = parse_date(end)?;
    let extra = closures
        .iter()
        .map(|s| parse_date(s))
        .collect::<Result<Vec<_>>>()?;

    let calendar = UsEquityCalendar::with_closures(extra);
    let days = calendar.trading_days(start, end)?;
    for day in &days {
        println!("{day}");
    }
    println!("{} trading days", days.len());
    Ok(())
}
