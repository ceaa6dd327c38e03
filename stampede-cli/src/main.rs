use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusBuilder;
use stampede::prelude::*;
use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "stampede")]
#[command(about = "Open-loop HTTP load testing", long_about = None)]
#[command(version)]
struct Cli {
    /// Log filter, in `tracing_subscriber::EnvFilter` syntax
    #[arg(long, env = "STAMPEDE_LOG", default_value = "stampede=info", global = true)]
    log: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load the target at a fixed rate and store the samples
    Run {
        #[arg(long, env = "STAMPEDE_HOST", default_value = "http://localhost:8080")]
        host: String,

        /// Requests per second, across all workers
        #[arg(long, env = "STAMPEDE_RATE", default_value = "1")]
        rate: NonZeroU32,

        /// Whole seconds, e.g. `30s` or `2m`
        #[arg(
            long,
            env = "STAMPEDE_DURATION",
            default_value = "30s",
            value_parser = humantime::parse_duration
        )]
        duration: Duration,

        #[arg(long, env = "STAMPEDE_OUT_DIR", default_value = "/tmp/data")]
        out_dir: PathBuf,

        #[arg(
            long,
            env = "STAMPEDE_READINESS_BACKOFF",
            default_value = "100ms",
            value_parser = humantime::parse_duration
        )]
        readiness_backoff: Duration,

        #[arg(long, env = "STAMPEDE_MAX_WORKER_RATE", default_value = "50")]
        max_worker_rate: NonZeroU32,

        /// Serve Prometheus metrics on this address while the run is going
        #[arg(long, env = "STAMPEDE_METRICS_ADDR")]
        metrics_addr: Option<SocketAddr>,
    },

    /// Aggregate every stored run into a report
    Report {
        #[arg(long, env = "STAMPEDE_DATA_DIR", default_value = "/tmp/data")]
        data_dir: PathBuf,

        #[arg(long, env = "STAMPEDE_REPORT_DIR", default_value = "/tmp/report")]
        out_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::new(&cli.log))
        .init();

    match cli.command {
        Commands::Run {
            host,
            rate,
            duration,
            out_dir,
            readiness_backoff,
            max_worker_rate,
            metrics_addr,
        } => {
            if duration.is_zero() || duration.subsec_nanos() != 0 {
                anyhow::bail!("--duration must be a positive whole number of seconds");
            }
            if let Some(addr) = metrics_addr {
                PrometheusBuilder::new()
                    .with_http_listener(addr)
                    .install()
                    .context("failed to start the metrics exporter")?;
                info!("Serving metrics on {addr}");
            }

            let config = RunConfig::new(duration, rate)
                .readiness_backoff(readiness_backoff)
                .max_worker_rate(max_worker_rate);
            info!(
                "Loading {host} at {rate} req/s for {}",
                humantime::format_duration(duration)
            );

            let run = Driver::new(config, move || ShortenerTarget::new(host.as_str()))
                .run()
                .context("load run failed")?;
            let path = run.save(&out_dir)?;

            match aggregate(&run) {
                Ok(stats) => info!("{stats}"),
                Err(err) => warn!("Run stored at {} has no statistics: {err}", path.display()),
            }
        }
        Commands::Report { data_dir, out_dir } => {
            let runs = load_runs(&data_dir)?;
            let report = Report::from_runs(&runs);
            report.write(&out_dir, &[&JsonRenderer, &TableRenderer])?;
            print!("{}", TableRenderer.render(&report)?);
        }
    }

    Ok(())
}
