mod utils;
use utils::*;

use anyhow::Context;
use mock_service::MockConfig;
use stampede::prelude::*;
use std::num::NonZeroU32;
use std::time::Duration;

fn load_at(url: &str, rate: u32) -> RunSamples {
    let url = url.to_string();
    let config = RunConfig::new(Duration::from_secs(1), NonZeroU32::new(rate).unwrap());
    Driver::new(config, move || ShortenerTarget::new(url.as_str()))
        .run()
        .unwrap()
}

#[test]
fn runs_round_trip_into_a_report() -> anyhow::Result<()> {
    let mock = mock(MockConfig::default().delay(Duration::from_millis(5)));
    let data = tempfile::tempdir()?;
    let out = tempfile::tempdir()?;

    for rate in [40, 20] {
        let run = load_at(&mock.url(), rate);
        let path = run.save(data.path())?;
        let expected = format!("1-{rate}.json");
        assert_eq!(path.file_name().and_then(|n| n.to_str()), Some(expected.as_str()));
    }

    let runs = load_runs(data.path())?;
    assert_eq!(runs.len(), 2);

    let report = Report::from_runs(&runs);
    assert!(report.skipped.is_empty());
    let rates: Vec<_> = report.rate_vs_latency.iter().map(|p| p.rate).collect();
    assert_eq!(rates, [20, 40]);
    assert!(report.rate_vs_latency.iter().all(|p| p.p50_ms >= 5.));

    let written = report.write(out.path(), &[&JsonRenderer, &TableRenderer])?;
    let json = std::fs::read_to_string(&written[0])
        .with_context(|| format!("reading {}", written[0].display()))?;
    let json: serde_json::Value = serde_json::from_str(&json)?;
    assert_eq!(json["rate_vs_latency"].as_array().map(Vec::len), Some(2));
    Ok(())
}

#[test]
#[ntest::timeout(10_000)]
fn empty_records_are_skipped() {
    init();
    let data = tempfile::tempdir().unwrap();
    RunSamples::new(Duration::from_secs(5), NonZeroU32::new(7).unwrap())
        .save(data.path())
        .unwrap();

    let report = Report::from_runs(&load_runs(data.path()).unwrap());

    assert!(report.runs.is_empty());
    assert_eq!(report.skipped[0].id, "5-7");
}
