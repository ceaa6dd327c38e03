use stampede_core::{RequestKind, Sample};
use std::fmt::Display;
use std::future::Future;
use std::time::Instant;
use tracing::{debug, trace};

pub const LATENCY_METRIC: &str = "stampede_request_latency";
pub const SUCCESS_METRIC: &str = "stampede_request_success";
pub const ERROR_METRIC: &str = "stampede_request_error";

/// Time a request and turn its outcome into a [`Sample`].
///
/// A failed request still yields a sample carrying the latency up to the failure.
pub async fn measure<F, R, E>(kind: RequestKind, request: F) -> Sample
where
    F: Future<Output = Result<R, E>>,
    E: Display,
{
    let start = Instant::now();
    let res = request.await;
    let elapsed = start.elapsed();

    let sample = match res {
        Ok(_) => {
            trace!("{kind} succeeded in {elapsed:?}");
            Sample::success(elapsed)
        }
        Err(err) => {
            debug!("{kind} failed after {elapsed:?}: {err}");
            Sample::failure(elapsed)
        }
    };

    #[cfg(feature = "metrics")]
    record(kind, &sample);

    sample
}

#[cfg(feature = "metrics")]
fn record(kind: RequestKind, sample: &Sample) {
    metrics::histogram!(LATENCY_METRIC, "kind" => kind.as_str())
        .record(sample.latency().as_secs_f64());

    if sample.succeeded() {
        metrics::counter!(SUCCESS_METRIC, "kind" => kind.as_str()).increment(1);
    } else {
        metrics::counter!(ERROR_METRIC, "kind" => kind.as_str()).increment(1);
    }
}

/// Register metric descriptions once per process rather than on every request.
pub fn describe_metrics() {
    #[cfg(feature = "metrics")]
    {
        metrics::describe_histogram!(
            LATENCY_METRIC,
            metrics::Unit::Seconds,
            "Latency of load-generation requests"
        );
        metrics::describe_counter!(SUCCESS_METRIC, "Requests that were served");
        metrics::describe_counter!(ERROR_METRIC, "Requests that failed or got a 5xx");
    }
}
