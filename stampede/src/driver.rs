//! Splits a run across worker threads and merges their samples.
use crate::target::{Target, TargetError};
use crate::worker::{Worker, WorkerError};
use stampede_core::{RunConfig, RunSamples, Sample};
use std::io;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use thiserror::Error;
use tracing::{debug, error, info, instrument, Span};

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("failed to spawn worker thread {id}: {source}")]
    Spawn {
        id: usize,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Worker(#[from] WorkerError),

    #[error("worker thread {0} panicked")]
    Panicked(usize),
}

/// Split `rate` across `ceil(rate / max_worker_rate)` workers of `ceil(rate / workers)` each.
///
/// The per-worker rates always add up to at least `rate`.
pub fn partition(rate: NonZeroU32, max_worker_rate: NonZeroU32) -> Vec<NonZeroU32> {
    let workers = rate.get().div_ceil(max_worker_rate.get());
    let per_worker = NonZeroU32::new(rate.get().div_ceil(workers)).unwrap_or(NonZeroU32::MIN);
    vec![per_worker; workers as usize]
}

/// Runs one load test: a worker thread per rate slice, each with its own runtime.
///
/// `make_target` is called once on every worker thread, so each worker owns an independent
/// client and connection pool.
pub struct Driver<F> {
    config: RunConfig,
    make_target: Arc<F>,
}

impl<F, T> Driver<F>
where
    F: Fn() -> Result<T, TargetError> + Send + Sync + 'static,
    T: Target,
{
    pub fn new(config: RunConfig, make_target: F) -> Self {
        Self {
            config,
            make_target: Arc::new(make_target),
        }
    }

    /// Block until every worker has drained, then merge all samples.
    ///
    /// The result is tagged with the configured duration and rate, not the per-worker rates.
    /// Any worker failure fails the whole run.
    #[instrument(name = "driver", skip_all, fields(run = %self.config.run_id()))]
    pub fn run(self) -> Result<RunSamples, DriverError> {
        let rates = partition(self.config.rate, self.config.max_worker_rate);
        info!(
            "Starting {} workers at {} req/s each for {}",
            rates.len(),
            rates[0],
            humantime::format_duration(self.config.duration)
        );
        crate::measure::describe_metrics();

        let mut handles = Vec::with_capacity(rates.len());
        let mut failure = None;
        for (id, rate) in rates.into_iter().enumerate() {
            match self.spawn_worker(id, rate) {
                Ok(handle) => handles.push(handle),
                Err(source) => {
                    error!("Could not spawn worker {id}: {source}");
                    failure = Some(DriverError::Spawn { id, source });
                    break;
                }
            }
        }

        // NOTE: Join every started worker, even after a failure, so none outlives the run.
        let mut run = RunSamples::new(self.config.duration, self.config.rate);
        for (id, handle) in handles.into_iter().enumerate() {
            match handle.join() {
                Ok(Ok(samples)) => {
                    debug!("Worker {id} returned {} samples", samples.len());
                    run.extend(samples);
                }
                Ok(Err(err)) => {
                    error!("{err}");
                    failure.get_or_insert(DriverError::Worker(err));
                }
                Err(_) => {
                    error!("Worker {id} panicked");
                    failure.get_or_insert(DriverError::Panicked(id));
                }
            }
        }

        if let Some(err) = failure {
            return Err(err);
        }

        info!(
            "Run complete: {} requests, {} failed",
            run.len(),
            run.failed_count()
        );
        Ok(run)
    }

    fn spawn_worker(
        &self,
        id: usize,
        rate: NonZeroU32,
    ) -> io::Result<JoinHandle<Result<Vec<Sample>, WorkerError>>> {
        let make_target = self.make_target.clone();
        let duration = self.config.duration;
        let backoff = self.config.readiness_backoff;
        let span = Span::current();

        thread::Builder::new()
            .name(format!("stampede-worker-{id}"))
            .spawn(move || {
                let _entered = span.enter();
                let target =
                    (*make_target)().map_err(|source| WorkerError::Target { id, source })?;
                Worker::new(id, target, duration, rate)
                    .readiness_backoff(backoff)
                    .run_blocking()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::tests::InstantTarget;
    use std::time::Duration;

    fn nz(v: u32) -> NonZeroU32 {
        NonZeroU32::new(v).unwrap()
    }

    #[test]
    fn partition_covers_rate() {
        for rate in 1..=2_000 {
            let rates = partition(nz(rate), nz(50));

            assert_eq!(rates.len() as u32, rate.div_ceil(50));
            assert!(rates.iter().map(|r| r.get()).sum::<u32>() >= rate);
            assert!(rates.iter().all(|r| r.get() <= 50));
        }
    }

    #[test]
    fn partition_examples() {
        assert_eq!(partition(nz(1), nz(50)), vec![nz(1)]);
        assert_eq!(partition(nz(50), nz(50)), vec![nz(50)]);
        assert_eq!(partition(nz(51), nz(50)), vec![nz(26), nz(26)]);
        assert_eq!(partition(nz(120), nz(50)), vec![nz(40); 3]);
        assert_eq!(partition(nz(10), nz(3)), vec![nz(3); 4]);
    }

    #[tracing_test::traced_test]
    #[test]
    #[ntest::timeout(4000)]
    fn merges_all_workers() {
        let config = RunConfig::new(Duration::from_secs(1), nz(120));
        let run = Driver::new(config, || Ok(InstantTarget::default()))
            .run()
            .unwrap();

        // Three workers of 40 req/s, each within one launch of 40.
        assert!((117..=123).contains(&run.len()), "{}", run.len());
        assert_eq!(run.rate(), nz(120));
        assert_eq!(run.duration(), Duration::from_secs(1));
        assert_eq!(run.failed_count(), 0);
    }

    #[test]
    #[ntest::timeout(4000)]
    fn worker_failure_fails_the_run() {
        let config = RunConfig::new(Duration::from_millis(200), nz(80));
        let res = Driver::new(config, || {
            Ok(InstantTarget {
                broken_setup: true,
                ..Default::default()
            })
        })
        .run();

        assert!(matches!(
            res,
            Err(DriverError::Worker(WorkerError::Setup { .. }))
        ));
    }

    #[test]
    #[ntest::timeout(4000)]
    fn target_construction_failure_fails_the_run() {
        let config = RunConfig::new(Duration::from_millis(200), nz(10));
        let res = Driver::new(config, || -> Result<InstantTarget, TargetError> {
            Err(TargetError::Client("no TLS backend".into()))
        })
        .run();

        assert!(matches!(
            res,
            Err(DriverError::Worker(WorkerError::Target { id: 0, .. }))
        ));
    }
}
