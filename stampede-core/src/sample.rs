use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMicroSeconds, DurationSeconds};
use std::num::NonZeroU32;
use std::time::Duration;

/// Outcome and latency of one request.
#[serde_as]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    succeeded: bool,
    #[serde_as(as = "DurationMicroSeconds<u64>")]
    #[serde(rename = "latency_us")]
    latency: Duration,
}

impl Sample {
    pub fn new(succeeded: bool, latency: Duration) -> Self {
        Self { succeeded, latency }
    }

    pub fn success(latency: Duration) -> Self {
        Self::new(true, latency)
    }

    pub fn failure(latency: Duration) -> Self {
        Self::new(false, latency)
    }

    pub fn succeeded(&self) -> bool {
        self.succeeded
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }
}

/// Every sample of one run, tagged with the run's nominal duration and rate.
///
/// Sample order carries no meaning.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSamples {
    #[serde_as(as = "DurationSeconds<u64>")]
    duration: Duration,
    rate: NonZeroU32,
    samples: Vec<Sample>,
}

impl RunSamples {
    pub fn new(duration: Duration, rate: NonZeroU32) -> Self {
        Self::with_samples(duration, rate, vec![])
    }

    pub fn with_samples(duration: Duration, rate: NonZeroU32, samples: Vec<Sample>) -> Self {
        Self {
            duration,
            rate,
            samples,
        }
    }

    pub fn push(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn rate(&self) -> NonZeroU32 {
        self.rate
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn succeeded_count(&self) -> usize {
        self.samples.iter().filter(|s| s.succeeded()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.len() - self.succeeded_count()
    }

    pub fn run_id(&self) -> String {
        run_id(self.duration, self.rate)
    }
}

impl Extend<Sample> for RunSamples {
    fn extend<I: IntoIterator<Item = Sample>>(&mut self, iter: I) {
        self.samples.extend(iter);
    }
}

/// `"{duration}-{rate}"`, with the duration in whole seconds.
pub fn run_id(duration: Duration, rate: NonZeroU32) -> String {
    format!("{}-{}", duration.as_secs(), rate)
}
