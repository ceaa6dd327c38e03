use crate::{RunSamples, Sample, StatsError};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSecondsWithFrac, DurationSeconds};
use std::fmt;
use std::num::NonZeroU32;
use std::time::Duration;

/// Summary statistics of one run.
///
/// Latency percentiles cover every sample, failed requests included.
#[serde_as]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunStatistics {
    #[serde_as(as = "DurationSeconds<u64>")]
    pub duration: Duration,
    pub target_rate: NonZeroU32,
    pub requests_sent: usize,
    pub observed_qps: f64,
    #[serde_as(as = "DurationMilliSecondsWithFrac<f64>")]
    pub latency_p50: Duration,
    #[serde_as(as = "DurationMilliSecondsWithFrac<f64>")]
    pub latency_p90: Duration,
    #[serde_as(as = "DurationMilliSecondsWithFrac<f64>")]
    pub latency_p99: Duration,
    pub error_rate: f64,
}

impl fmt::Display for RunStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Sent={}, QPS={:.2}, ErrorRate={:.4}, p50={:?}, p90={:?}, p99={:?}",
            self.requests_sent,
            self.observed_qps,
            self.error_rate,
            self.latency_p50,
            self.latency_p90,
            self.latency_p99,
        )
    }
}

/// Compute the statistics of a run.
///
/// Fails rather than producing NaN when the run has no samples or a zero duration.
pub fn aggregate(run: &RunSamples) -> Result<RunStatistics, StatsError> {
    let error_rate = error_rate(run.succeeded_count(), run.failed_count())?;
    if run.duration().is_zero() {
        return Err(StatsError::ZeroDuration);
    }

    let requests_sent = run.len();
    let observed_qps = requests_sent as f64 / run.duration().as_secs_f64();

    let mut latencies: Vec<Duration> = run.samples().iter().map(Sample::latency).collect();
    latencies.sort_unstable();

    Ok(RunStatistics {
        duration: run.duration(),
        target_rate: run.rate(),
        requests_sent,
        observed_qps,
        latency_p50: percentile(&latencies, 50.)?,
        latency_p90: percentile(&latencies, 90.)?,
        latency_p99: percentile(&latencies, 99.)?,
        error_rate,
    })
}

pub fn error_rate(succeeded: usize, failed: usize) -> Result<f64, StatsError> {
    let total = succeeded + failed;
    if total == 0 {
        return Err(StatsError::EmptyRun);
    }
    Ok(failed as f64 / total as f64)
}

/// Percentile of already sorted values, interpolating linearly between the two closest ranks.
pub fn percentile(sorted: &[Duration], p: f64) -> Result<Duration, StatsError> {
    if !(0. ..=100.).contains(&p) {
        return Err(StatsError::InvalidPercentile(p));
    }
    let last = sorted.len().checked_sub(1).ok_or(StatsError::EmptyRun)?;

    let rank = p / 100. * last as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;

    let lo_ns = sorted[lo].as_nanos() as f64;
    let hi_ns = sorted[hi].as_nanos() as f64;
    let value = lo_ns + (hi_ns - lo_ns) * (rank - lo as f64);

    Ok(Duration::from_nanos(value.round() as u64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::SmallRng, Rng, SeedableRng};
    use rand_distr::{Distribution, SkewNormal, Uniform};

    fn rate(r: u32) -> NonZeroU32 {
        NonZeroU32::new(r).unwrap()
    }

    fn skewed_run(seed: u64, count: usize) -> RunSamples {
        let mut rng = SmallRng::seed_from_u64(seed);
        let normal = SkewNormal::new(0.2, 0.05, 20.).unwrap();
        let samples = (0..count)
            .map(|_| {
                let secs = Distribution::<f64>::sample(&normal, &mut rng).max(0.);
                Sample::new(rng.gen_bool(0.9), Duration::from_secs_f64(secs))
            })
            .collect();
        RunSamples::with_samples(Duration::from_secs(5), rate(20), samples)
    }

    #[test]
    fn mixed_outcome_scenario() {
        let mut rng = SmallRng::seed_from_u64(7);
        let uniform = Uniform::new_inclusive(100, 200);

        let mut samples: Vec<Sample> = (0..90)
            .map(|_| Sample::success(Duration::from_millis(uniform.sample(&mut rng))))
            .collect();
        samples.extend((0..10).map(|_| Sample::failure(Duration::from_millis(500))));
        let run = RunSamples::with_samples(Duration::from_secs(10), rate(10), samples);

        let stats = aggregate(&run).unwrap();

        assert_eq!(stats.requests_sent, 100);
        assert_eq!(stats.observed_qps, 10.);
        assert!((stats.error_rate - 0.10).abs() < f64::EPSILON);
        assert_eq!(stats.latency_p99, Duration::from_millis(500));
        assert!(stats.latency_p50 >= Duration::from_millis(100));
        assert!(stats.latency_p50 <= Duration::from_millis(200));
    }

    #[test]
    fn empty_run_is_division_by_zero() {
        let run = RunSamples::new(Duration::from_secs(10), rate(10));
        assert_eq!(aggregate(&run), Err(StatsError::EmptyRun));
    }

    #[test]
    fn zero_duration_is_division_by_zero() {
        let run = RunSamples::with_samples(
            Duration::ZERO,
            rate(10),
            vec![Sample::success(Duration::from_millis(1))],
        );
        assert_eq!(aggregate(&run), Err(StatsError::ZeroDuration));
    }

    #[test]
    fn requests_sent_matches_sample_count() {
        for count in [1, 2, 17, 500] {
            let stats = aggregate(&skewed_run(count as u64, count)).unwrap();
            assert_eq!(stats.requests_sent, count);
        }
    }

    #[test]
    fn error_rate_bounds() {
        assert_eq!(error_rate(10, 0).unwrap(), 0.);
        assert_eq!(error_rate(0, 10).unwrap(), 1.);
        assert_eq!(error_rate(3, 1).unwrap(), 0.25);
        assert_eq!(error_rate(0, 0), Err(StatsError::EmptyRun));

        for seed in 0..20 {
            let stats = aggregate(&skewed_run(seed, 100)).unwrap();
            assert!((0. ..=1.).contains(&stats.error_rate));
        }
    }

    #[test]
    fn percentiles_are_monotonic() {
        for seed in 0..50 {
            let stats = aggregate(&skewed_run(seed, 1 + seed as usize * 7)).unwrap();
            assert!(stats.latency_p50 <= stats.latency_p90);
            assert!(stats.latency_p90 <= stats.latency_p99);
        }
    }

    #[test]
    fn aggregation_is_idempotent() {
        let run = skewed_run(42, 1_000);
        let first = aggregate(&run).unwrap();
        let second = aggregate(&run).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.observed_qps.to_bits(), second.observed_qps.to_bits());
        assert_eq!(first.error_rate.to_bits(), second.error_rate.to_bits());
    }

    #[test]
    fn interpolates_between_ranks() {
        let sorted: Vec<_> = [10, 20, 30, 40].map(Duration::from_millis).to_vec();

        assert_eq!(percentile(&sorted, 0.).unwrap(), Duration::from_millis(10));
        assert_eq!(percentile(&sorted, 50.).unwrap(), Duration::from_millis(25));
        assert_eq!(percentile(&sorted, 90.).unwrap(), Duration::from_millis(37));
        assert_eq!(percentile(&sorted, 100.).unwrap(), Duration::from_millis(40));
    }

    #[test]
    fn single_value_percentiles() {
        let sorted = [Duration::from_millis(8)];
        assert_eq!(percentile(&sorted, 99.).unwrap(), Duration::from_millis(8));
    }

    #[test]
    fn rejects_out_of_range_percentile() {
        let sorted = [Duration::from_millis(8)];
        assert_eq!(
            percentile(&sorted, 101.),
            Err(StatsError::InvalidPercentile(101.))
        );
        assert_eq!(percentile(&[], 50.), Err(StatsError::EmptyRun));
    }
}
