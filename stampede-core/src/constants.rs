use std::num::NonZeroU32;
use std::time::Duration;

/// Nominal requests per second a single worker is asked to carry before the load is split
/// across another worker.
pub const DEFAULT_MAX_WORKER_RATE: NonZeroU32 = unsafe { NonZeroU32::new_unchecked(50) };

/// Delay between readiness probes while waiting for the target to come up.
pub const DEFAULT_READINESS_BACKOFF: Duration = Duration::from_millis(100);

pub const DEFAULT_RUN_DURATION: Duration = Duration::from_secs(30);

pub const DEFAULT_RATE: NonZeroU32 = unsafe { NonZeroU32::new_unchecked(1) };

/// File extension of persisted run records.
pub const RUN_RECORD_EXTENSION: &str = "json";
