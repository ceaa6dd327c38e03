//! Cross-run report: per-run statistics, a percentile table, and rate-vs-latency series for an
//! external plotting tool.
use serde::Serialize;
use stampede_core::{aggregate, RunStatistics, StoredRun};
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to create report directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to render report: {0}")]
    Render(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub id: String,
    #[serde(flatten)]
    pub stats: RunStatistics,
}

/// A run that could not be aggregated, e.g. because it has no samples.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedRun {
    pub id: String,
    pub reason: String,
}

/// One point of the rate-vs-latency plots. Latencies are in milliseconds.
#[derive(Debug, Clone, Serialize)]
pub struct LatencyPoint {
    pub rate: u32,
    pub duration_secs: u64,
    pub observed_qps: f64,
    pub p50_ms: f64,
    pub p90_ms: f64,
    pub p99_ms: f64,
    pub error_rate: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Report {
    /// Aggregated runs, in the order they were enumerated.
    pub runs: Vec<RunSummary>,
    pub skipped: Vec<SkippedRun>,
    /// Same runs, sorted by target rate then duration.
    pub rate_vs_latency: Vec<LatencyPoint>,
}

impl Report {
    pub fn from_runs(runs: &[StoredRun]) -> Self {
        let mut report = Report::default();
        for run in runs {
            match aggregate(&run.samples) {
                Ok(stats) => {
                    debug!("{}: {stats}", run.id);
                    report.runs.push(RunSummary {
                        id: run.id.clone(),
                        stats,
                    });
                }
                Err(err) => {
                    warn!("Skipping run {}: {err}", run.id);
                    report.skipped.push(SkippedRun {
                        id: run.id.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        report.rate_vs_latency = report
            .runs
            .iter()
            .map(|r| latency_point(&r.stats))
            .collect();
        report
            .rate_vs_latency
            .sort_by_key(|p| (p.rate, p.duration_secs));
        report
    }

    /// Render with every renderer into `dir`, creating it if needed. Returns the written paths.
    pub fn write(
        &self,
        dir: &Path,
        renderers: &[&dyn Renderer],
    ) -> Result<Vec<PathBuf>, ReportError> {
        fs::create_dir_all(dir).map_err(|source| ReportError::CreateDir {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut written = vec![];
        for renderer in renderers {
            let path = dir.join(renderer.file_name());
            let contents = renderer.render(self)?;
            fs::write(&path, contents).map_err(|source| ReportError::Write {
                path: path.clone(),
                source,
            })?;
            info!("Report written to {}", path.display());
            written.push(path);
        }
        Ok(written)
    }
}

fn latency_point(stats: &RunStatistics) -> LatencyPoint {
    LatencyPoint {
        rate: stats.target_rate.get(),
        duration_secs: stats.duration.as_secs(),
        observed_qps: stats.observed_qps,
        p50_ms: millis(stats.latency_p50),
        p90_ms: millis(stats.latency_p90),
        p99_ms: millis(stats.latency_p99),
        error_rate: stats.error_rate,
    }
}

fn millis(d: Duration) -> f64 {
    d.as_nanos() as f64 / 1e6
}

/// Turns a [`Report`] into one output document.
pub trait Renderer {
    fn file_name(&self) -> &'static str;
    fn render(&self, report: &Report) -> Result<String, ReportError>;
}

pub struct JsonRenderer;

impl Renderer for JsonRenderer {
    fn file_name(&self) -> &'static str {
        "report.json"
    }

    fn render(&self, report: &Report) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(report)?)
    }
}

/// Fixed-width percentile table, one row per run in enumeration order.
pub struct TableRenderer;

impl Renderer for TableRenderer {
    fn file_name(&self) -> &'static str {
        "report.txt"
    }

    fn render(&self, report: &Report) -> Result<String, ReportError> {
        let mut out = String::new();
        // NOTE: Writing into a String cannot fail.
        let _ = writeln!(
            out,
            "{:<16} {:>9} {:>7} {:>9} {:>10} {:>10} {:>10} {:>10} {:>8}",
            "run", "duration", "rate", "sent", "qps", "p50 ms", "p90 ms", "p99 ms", "errors"
        );
        for RunSummary { id, stats } in &report.runs {
            let _ = writeln!(
                out,
                "{:<16} {:>9} {:>7} {:>9} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>7.2}%",
                id,
                humantime::format_duration(stats.duration).to_string(),
                stats.target_rate,
                stats.requests_sent,
                stats.observed_qps,
                millis(stats.latency_p50),
                millis(stats.latency_p90),
                millis(stats.latency_p99),
                stats.error_rate * 100.,
            );
        }
        for skipped in &report.skipped {
            let _ = writeln!(out, "{:<16} skipped: {}", skipped.id, skipped.reason);
        }
        Ok(out)
    }
}
