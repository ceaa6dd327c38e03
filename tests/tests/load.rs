mod utils;
use utils::*;

use mock_service::MockConfig;
use stampede::prelude::*;
use std::num::{NonZeroU32, NonZeroU64};
use std::time::{Duration, Instant};

#[test]
#[ntest::timeout(10_000)]
fn failed_redirects_are_sampled() {
    let mock = mock(MockConfig::default().fail_every(NonZeroU64::new(4).unwrap()));
    let url = mock.url();

    let config = RunConfig::new(Duration::from_secs(2), NonZeroU32::new(60).unwrap());
    let run = Driver::new(config, move || ShortenerTarget::new(url.as_str()))
        .run()
        .unwrap();

    // Two workers at 30/s each.
    assert!((110..=130).contains(&run.len()), "{} samples", run.len());
    assert_eq!(run.failed_count() as u64, mock.state.redirects() / 4);

    let stats = aggregate(&run).unwrap();
    assert_eq!(stats.requests_sent, run.len());
    assert!((0.15..=0.25).contains(&stats.error_rate), "{stats}");
    assert!((55. ..=65.).contains(&stats.observed_qps), "{stats}");
}

#[test]
#[ntest::timeout(10_000)]
fn every_worker_runs_its_own_setup() {
    let mock = mock(MockConfig::default());
    let url = mock.url();

    let config = RunConfig::new(Duration::from_secs(1), NonZeroU32::new(30).unwrap())
        .max_worker_rate(NonZeroU32::new(10).unwrap());
    let run = Driver::new(config, move || ShortenerTarget::new(url.as_str()))
        .run()
        .unwrap();

    assert_eq!(run.failed_count(), 0);
    // One setup user per worker.
    assert!(mock.state.users() >= 3);
}

#[test]
#[ntest::timeout(10_000)]
fn slow_responses_are_drained() {
    let delay = Duration::from_millis(300);
    let mock = mock(MockConfig::default().delay(delay));
    let url = mock.url();

    let config = RunConfig::new(Duration::from_millis(500), NonZeroU32::new(20).unwrap());
    let run = Driver::new(config, move || ShortenerTarget::new(url.as_str()))
        .run()
        .unwrap();

    assert!(!run.is_empty());
    assert!(run.samples().iter().all(|s| s.latency() >= delay));
}

#[test]
#[ntest::timeout(10_000)]
fn waits_for_late_target() {
    init();
    let addr = free_addr();

    let config = RunConfig::new(Duration::from_secs(1), NonZeroU32::new(10).unwrap())
        .readiness_backoff(Duration::from_millis(50));
    let start = Instant::now();
    let driver = std::thread::spawn(move || {
        Driver::new(config, move || ShortenerTarget::new(format!("http://{addr}"))).run()
    });

    std::thread::sleep(Duration::from_millis(400));
    let mock = mock_service::spawn_on(addr, MockConfig::default()).unwrap();

    let run = driver.join().unwrap().unwrap();
    assert!(start.elapsed() >= Duration::from_millis(1_300));
    assert!((8..=12).contains(&run.len()), "{} samples", run.len());
    assert!(mock.state.requests() as usize >= run.len());
}

#[test]
#[ntest::timeout(10_000)]
fn setup_against_wrong_service_fails() {
    init();
    // Answers probes, but every route other than the shortener's is a 404.
    let mock = mock(MockConfig::default());
    let url = format!("{}/nested", mock.url());

    let config = RunConfig::new(Duration::from_secs(1), NonZeroU32::new(5).unwrap());
    let res = Driver::new(config, move || ShortenerTarget::new(url.as_str())).run();

    assert!(res.is_err());
}
