use governor::{DefaultDirectRateLimiter, Quota};
use std::num::NonZeroU32;
use std::time::Duration;

/// Paces the request launches of one worker at a fixed cadence of `1 / rate`.
///
/// This is open loop: the cadence never adapts to how long requests take, and waiting on the
/// limiter never waits on a request.
pub struct RateLimiter {
    limiter: DefaultDirectRateLimiter,
    rate: NonZeroU32,
}

impl RateLimiter {
    pub fn new(rate: NonZeroU32) -> Self {
        let limiter =
            governor::RateLimiter::direct(Quota::per_second(rate).allow_burst(NonZeroU32::MIN));

        // NOTE: The bucket starts with one free cell. Spend it here so the first `next()`
        // already waits a full interval after the first launch.
        let _ = limiter.check();

        Self { limiter, rate }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(1) / self.rate.get()
    }

    /// Suspend until the next launch slot.
    pub async fn next(&self) {
        self.limiter.until_ready().await;
    }
}
