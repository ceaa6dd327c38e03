use crate::{
    DEFAULT_MAX_WORKER_RATE, DEFAULT_RATE, DEFAULT_READINESS_BACKOFF, DEFAULT_RUN_DURATION,
};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds, DurationSeconds};
use std::num::NonZeroU32;
use std::time::Duration;

/// Parameters of a single run.
///
/// `duration` and `rate` are the nominal values a run is tagged with; the driver splits `rate`
/// across workers carrying at most `max_worker_rate` each.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde_as(as = "DurationSeconds<u64>")]
    pub duration: Duration,
    pub rate: NonZeroU32,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(default = "default_readiness_backoff")]
    pub readiness_backoff: Duration,
    #[serde(default = "default_max_worker_rate")]
    pub max_worker_rate: NonZeroU32,
}

impl RunConfig {
    pub fn new(duration: Duration, rate: NonZeroU32) -> Self {
        Self {
            duration,
            rate,
            readiness_backoff: DEFAULT_READINESS_BACKOFF,
            max_worker_rate: DEFAULT_MAX_WORKER_RATE,
        }
    }

    pub fn readiness_backoff(mut self, backoff: Duration) -> Self {
        self.readiness_backoff = backoff;
        self
    }

    pub fn max_worker_rate(mut self, max_worker_rate: NonZeroU32) -> Self {
        self.max_worker_rate = max_worker_rate;
        self
    }

    /// Identifier of the run, also used as the stem of its record file.
    pub fn run_id(&self) -> String {
        crate::run_id(self.duration, self.rate)
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self::new(DEFAULT_RUN_DURATION, DEFAULT_RATE)
    }
}

fn default_readiness_backoff() -> Duration {
    DEFAULT_READINESS_BACKOFF
}

fn default_max_worker_rate() -> NonZeroU32 {
    DEFAULT_MAX_WORKER_RATE
}
