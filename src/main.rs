use std::io::stdout;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::Result;
use sysmon::config::{Config, LogFormat, load_config, load_config_from_path};
use sysmon::filter::AttributeFilter;
use sysmon::format::write_json;
use sysmon::pipeline::{monitor, single};
use sysmon::system::collector::{LocalResolver, LocalSampler};
use sysmon::system::feed::FeedSource;
use sysmon::system::resolver::StaticResolver;
use sysmon::system::source::SnapshotSource;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "sysmon",
    about = "Process resource usage from a snapshot sampling service",
    arg_required_else_help = true
)]
struct Cli {
    /// Path to config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Sampling interval in milliseconds (also paces --replay)
    #[arg(long, global = true)]
    interval_ms: Option<u64>,

    /// Replay snapshots from a newline-delimited JSON recording
    #[arg(long, global = true, conflicts_with = "connect")]
    replay: Option<PathBuf>,

    /// Read snapshots from a sampling service feed (host:port)
    #[arg(long, global = true)]
    connect: Option<String>,

    /// JSON object mapping pids to exec names, used with --replay/--connect
    #[arg(long, global = true)]
    exec_names: Option<PathBuf>,

    /// Log line format
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Process monitor options
    #[command(arg_required_else_help = true)]
    Process {
        #[command(subcommand)]
        command: ProcessCommand,
    },
}

#[derive(Subcommand)]
enum ProcessCommand {
    /// Monitor all processes whose cpuUsage is at or above the threshold
    Monitor {
        #[arg(long)]
        threshold: f64,
    },
    /// Show a single snapshot of currently running processes
    Single {
        /// Filter processes by attribute value, given as key=value. Repeatable.
        #[arg(short = 'a', long = "attributes")]
        attributes: Vec<String>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let config = load_config_for_cli(&cli);
    sysmon::logging::init(&config.logging)?;

    let Command::Process { command } = &cli.command;
    match command {
        ProcessCommand::Monitor { threshold } => run_monitor(&cli, &config, *threshold).await,
        ProcessCommand::Single { attributes } => {
            // Rejected before any source is opened.
            let filter = AttributeFilter::parse(attributes)?;
            run_single(&cli, &config, &filter).await
        }
    }
}

fn load_config_for_cli(cli: &Cli) -> Config {
    let mut config = match &cli.config {
        Some(path) => load_config_from_path(path),
        None => load_config(),
    };

    if let Some(interval) = cli.interval_ms {
        config.sampler.interval_ms = interval;
    }
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }

    config
}

fn feed_source(cli: &Cli, config: &Config) -> Option<FeedSource> {
    if let Some(path) = &cli.replay {
        let pace = Duration::from_millis(config.sampler.interval_ms);
        return Some(FeedSource::replay(path, Some(pace)));
    }
    cli.connect.as_deref().map(FeedSource::connect)
}

fn static_resolver(cli: &Cli, config: &Config) -> Result<StaticResolver> {
    match &cli.exec_names {
        Some(path) => StaticResolver::from_path(path, config.resolver.fallback.clone()),
        None => Ok(StaticResolver::new(Default::default(), config.resolver.fallback.clone())),
    }
}

async fn run_monitor(cli: &Cli, config: &Config, threshold: f64) -> Result<()> {
    let summary = match feed_source(cli, config) {
        Some(mut source) => monitor_with(&mut source, threshold).await?,
        None => {
            let mut source = LocalSampler::new(Duration::from_millis(config.sampler.interval_ms));
            monitor_with(&mut source, threshold).await?
        }
    };
    info!(ticks = summary.ticks, "monitor stopped");
    Ok(())
}

async fn monitor_with<S: SnapshotSource>(
    source: &mut S,
    threshold: f64,
) -> Result<monitor::MonitorSummary> {
    let shutdown = async {
        // A failing signal handler means no way to stop cleanly; keep streaming.
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };
    Ok(monitor::run(source, threshold, shutdown, monitor::log_tick).await?)
}

async fn run_single(cli: &Cli, config: &Config, filter: &AttributeFilter) -> Result<()> {
    let result = match feed_source(cli, config) {
        Some(mut source) => {
            let mut resolver = static_resolver(cli, config)?;
            single::run(&mut source, &mut resolver, filter).await?
        }
        None => {
            let mut source = LocalSampler::new(Duration::from_millis(config.sampler.interval_ms));
            let mut resolver = LocalResolver::new(config.resolver.fallback.clone());
            single::run(&mut source, &mut resolver, filter).await?
        }
    };
    write_json(stdout().lock(), &result, config.output.pretty)?;
    Ok(())
}
