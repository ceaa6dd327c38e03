use crate::measure::measure;
use crate::rate_limiter::RateLimiter;
use crate::target::{Target, TargetError};
use stampede_core::{RequestMix, Sample};
use std::io;
use std::num::NonZeroU32;
use std::rc::Rc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::{JoinError, JoinSet, LocalSet};
use tokio::time::Instant;
use tracing::{debug, info, instrument};

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("worker {id} could not start its runtime: {source}")]
    Runtime {
        id: usize,
        #[source]
        source: io::Error,
    },

    #[error("worker {id} could not build its target: {source}")]
    Target {
        id: usize,
        #[source]
        source: TargetError,
    },

    #[error("worker {id} failed to set up: {source}")]
    Setup {
        id: usize,
        #[source]
        source: TargetError,
    },

    #[error("worker {id} lost an in-flight request: {source}")]
    Request {
        id: usize,
        #[source]
        source: JoinError,
    },
}

/// Open-loop request loop for one slice of the total rate.
pub struct Worker<T> {
    id: usize,
    target: T,
    duration: Duration,
    rate: NonZeroU32,
    readiness_backoff: Duration,
}

impl<T: Target> Worker<T> {
    pub fn new(id: usize, target: T, duration: Duration, rate: NonZeroU32) -> Self {
        Self {
            id,
            target,
            duration,
            rate,
            readiness_backoff: stampede_core::DEFAULT_READINESS_BACKOFF,
        }
    }

    pub fn readiness_backoff(mut self, backoff: Duration) -> Self {
        self.readiness_backoff = backoff;
        self
    }

    /// Run to completion on a fresh single-threaded runtime owned by the calling thread.
    pub fn run_blocking(self) -> Result<Vec<Sample>, WorkerError> {
        let id = self.id;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|source| WorkerError::Runtime { id, source })?;

        LocalSet::new().block_on(&runtime, self.run())
    }

    /// Wait for the target, set it up, then launch requests until the deadline and drain.
    ///
    /// Requests are spawned with [`tokio::task::spawn_local`] semantics, so this future must be
    /// driven inside a [`LocalSet`].
    #[instrument(name = "worker", skip_all, fields(id = self.id, rate = self.rate.get()))]
    pub async fn run(self) -> Result<Vec<Sample>, WorkerError> {
        let Self {
            id,
            target,
            duration,
            rate,
            readiness_backoff,
        } = self;

        wait_for_startup(&target, readiness_backoff).await;
        let fixture = target
            .setup()
            .await
            .map_err(|source| WorkerError::Setup { id, source })?;

        let target = Rc::new(target);
        let fixture = Rc::new(fixture);
        let limiter = RateLimiter::new(rate);
        let mut in_flight = JoinSet::new();

        info!(
            "Issuing {rate} req/s for {}",
            humantime::format_duration(duration)
        );
        debug!("Launching every {:?}", limiter.interval());

        // NOTE: This loop is time-sensitive. Nothing but the limiter may await here.
        let start = Instant::now();
        for kind in RequestMix::new() {
            let target = target.clone();
            let fixture = fixture.clone();
            in_flight.spawn_local(async move { measure(kind, target.issue(kind, &fixture)).await });

            limiter.next().await;
            if start.elapsed() > duration {
                break;
            }
        }

        let launched = in_flight.len();
        info!("Deadline reached after {launched} launches, draining in-flight requests");

        let mut samples = Vec::with_capacity(launched);
        while let Some(res) = in_flight.join_next().await {
            samples.push(res.map_err(|source| WorkerError::Request { id, source })?);
        }

        debug!("Drained {} samples", samples.len());
        Ok(samples)
    }
}

/// Probe until the target answers. There is no retry limit; an unreachable target blocks forever.
async fn wait_for_startup<T: Target>(target: &T, backoff: Duration) {
    let mut attempts = 0u64;
    loop {
        match target.probe().await {
            Ok(()) => {
                info!("Target is up and ready to be tested");
                return;
            }
            Err(err) => {
                attempts += 1;
                if attempts == 1 {
                    info!("Waiting for target startup");
                }
                debug!("Probe {attempts} failed: {err}");
                tokio::time::sleep(backoff).await;
            }
        }
    }
}
