#![forbid(unsafe_code)]

//! `tsm`: telemetry station monitor command line.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tsm::snmp::SnmpSession;
use tsm::{poll, shutdown, status, SessionTarget, SystemClock};
use tsm_core::config::TsmConfig;
use tsm_core::SampleInterval;

#[derive(Parser, Debug)]
#[command(name = "tsm", version, about = "Telemetry station monitor")]
struct Cli {
    /// Enable debug logging (RUST_LOG overrides).
    #[arg(short, long)]
    debug: bool,

    /// Config file. Default: first tsm.toml in ., ~/dev/tsm, ~/etc.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// SNMP read community.
    #[arg(long, default_value = "public")]
    community: String,

    /// Per-request SNMP timeout in seconds.
    #[arg(long, default_value_t = 2)]
    timeout_secs: u64,

    /// Device address, HOST or HOST:PORT (port defaults to 161).
    host: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the current device state.
    Status {
        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,

        /// Keep the session open and reprint every second until terminated.
        #[arg(short, long)]
        watch: bool,
    },

    /// Emit one record per sample interval until terminated.
    Poll {
        /// Sample interval in seconds, 1 to 60.
        interval: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let exe = std::env::current_exe().unwrap_or_else(|_| PathBuf::from("tsm"));
    info!(exe = %exe.display(), "starting up");

    let cfg = TsmConfig::load(cli.config.as_deref()).context("load config")?;
    let target = SessionTarget::resolve(
        &cli.host,
        &cli.community,
        Duration::from_secs(cli.timeout_secs),
    )
    .await
    .with_context(|| format!("resolve {}", cli.host))?;

    let session = Arc::new(SnmpSession::new());
    match cli.cmd {
        Command::Status { json, watch: true } => {
            let stop = shutdown::install().context("install signal handlers")?;
            status::watch_status(
                session.as_ref(),
                &target,
                &cfg,
                json,
                status::STATUS_REFRESH,
                stop,
                &mut std::io::stdout(),
            )
            .await?;
        }
        Command::Status { json, watch: false } => {
            let report = status::query_status(session.as_ref(), &target, &cfg).await?;
            status::write_report(&report, json, &mut std::io::stdout())?;
        }
        Command::Poll { interval } => {
            let interval = SampleInterval::parse(&interval)?;
            let stop = shutdown::install().context("install signal handlers")?;
            poll::run_poll(
                session,
                &target,
                &cfg,
                interval,
                Arc::new(SystemClock),
                stop,
                &mut std::io::stdout(),
            )
            .await?;
        }
    }

    info!("shutting down");
    Ok(())
}
