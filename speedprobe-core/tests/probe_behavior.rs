use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use speedprobe_core::{ProbeConfig, ProgressFn, SpeedProbe};
use speedprobe_testserver::{TestServer, TestServerConfig};

fn counting_progress() -> (ProgressFn, Arc<AtomicU64>) {
    let count = Arc::new(AtomicU64::new(0));
    let counter = count.clone();
    let progress: ProgressFn = Arc::new(move |_speed| {
        counter.fetch_add(1, Ordering::Relaxed);
    });
    (progress, count)
}

/// A base URL on a port nothing listens on, so every connect is refused.
async fn refused_base_url() -> String {
    let listener = match tokio::net::TcpListener::bind("127.0.0.1:0").await {
        Ok(l) => l,
        Err(err) => panic!("bind: {err}"),
    };
    let addr = match listener.local_addr() {
        Ok(addr) => addr,
        Err(err) => panic!("local_addr: {err}"),
    };
    drop(listener);
    format!("http://{addr}")
}

#[tokio::test]
async fn download_averages_over_custom_cycles() {
    let server = match TestServer::start().await {
        Ok(s) => s,
        Err(err) => panic!("start test server: {err}"),
    };

    let mut cfg = ProbeConfig::new(server.base_url());
    cfg.chunk_size_kb = Some(128);
    cfg.cycles = Some(3);

    let (progress, calls) = counting_progress();
    let probe = SpeedProbe::new(cfg);
    let outcome = probe.download(Some(&progress)).await;

    assert!(outcome.aborted.is_none());
    assert!(outcome.speed > 0.0, "speed={}", outcome.speed);
    assert_eq!(outcome.attempts_completed, 3);
    assert_eq!(outcome.attempts_skipped, 0);
    // 128 KB transfers sit inside the small-transfer exemption, so every
    // completed attempt is a valid sample regardless of how fast it was.
    assert_eq!(outcome.valid_samples, 3);
    assert_eq!(calls.load(Ordering::Relaxed), outcome.attempts_completed);
    assert_eq!(server.stats().downloads_total(), 3);

    server.shutdown().await;
}

#[tokio::test]
async fn missing_sizes_are_skipped_and_the_rest_still_average() {
    // Cap the server at 256 KB: the first two ladder rungs succeed, the
    // remaining nine answer 404 and must be skipped, not fatal.
    let server = match TestServer::start_with(TestServerConfig {
        max_size_kb: 256,
        ..TestServerConfig::default()
    })
    .await
    {
        Ok(s) => s,
        Err(err) => panic!("start test server: {err}"),
    };

    let cfg = ProbeConfig::new(server.base_url());
    let (progress, calls) = counting_progress();
    let probe = SpeedProbe::new(cfg);
    let outcome = probe.download(Some(&progress)).await;

    assert!(outcome.aborted.is_none());
    assert!(outcome.speed > 0.0);
    assert_eq!(outcome.attempts_completed, 2);
    assert_eq!(outcome.attempts_skipped, 9);
    assert_eq!(calls.load(Ordering::Relaxed), 2);
    assert_eq!(server.stats().downloads_total(), 2);
    assert_eq!(server.stats().not_found_total(), 9);

    server.shutdown().await;
}

#[tokio::test]
async fn all_skippable_failures_report_zero_without_aborting() {
    // A zero size cap turns every download into a 404.
    let server = match TestServer::start_with(TestServerConfig {
        max_size_kb: 0,
        ..TestServerConfig::default()
    })
    .await
    {
        Ok(s) => s,
        Err(err) => panic!("start test server: {err}"),
    };

    let cfg = ProbeConfig::new(server.base_url());
    let (progress, calls) = counting_progress();
    let probe = SpeedProbe::new(cfg);
    let outcome = probe.download(Some(&progress)).await;

    assert!(outcome.aborted.is_none());
    assert_eq!(outcome.speed, 0.0);
    assert_eq!(outcome.attempts_completed, 0);
    assert_eq!(outcome.attempts_skipped, 11);
    assert_eq!(calls.load(Ordering::Relaxed), 0);

    server.shutdown().await;
}

#[tokio::test]
async fn transport_failure_aborts_the_whole_run() {
    let mut cfg = ProbeConfig::new(&refused_base_url().await);
    cfg.chunk_size_kb = Some(128);
    cfg.cycles = Some(5);
    cfg.connect_timeout = Some(Duration::from_millis(300));

    let (progress, calls) = counting_progress();
    let probe = SpeedProbe::new(cfg);
    let outcome = probe.download(Some(&progress)).await;

    assert!(outcome.aborted.is_some(), "expected a transport abort");
    assert_eq!(outcome.speed, 0.0);
    assert_eq!(outcome.attempts_completed, 0);
    // The first transport error ends the run; later attempts are never
    // issued and the callback never fires.
    assert_eq!(calls.load(Ordering::Relaxed), 0);
}

#[tokio::test]
async fn duration_budget_stops_after_the_current_attempt() {
    let server = match TestServer::start_with(TestServerConfig {
        response_delay: Duration::from_millis(50),
        ..TestServerConfig::default()
    })
    .await
    {
        Ok(s) => s,
        Err(err) => panic!("start test server: {err}"),
    };

    let mut cfg = ProbeConfig::new(server.base_url());
    cfg.chunk_size_kb = Some(128);
    cfg.cycles = Some(5);
    // A budget far below the per-attempt delay: the first attempt completes,
    // the budget check then ends the run before attempt two.
    cfg.duration_budget = Some(Duration::from_millis(1));

    let (progress, calls) = counting_progress();
    let probe = SpeedProbe::new(cfg);
    let outcome = probe.download(Some(&progress)).await;

    assert!(outcome.aborted.is_none());
    assert_eq!(outcome.attempts_completed, 1);
    assert_eq!(calls.load(Ordering::Relaxed), 1);
    assert_eq!(server.stats().downloads_total(), 1);
    // The completed attempt still contributes to the result.
    assert!(outcome.speed > 0.0);

    server.shutdown().await;
}

#[tokio::test]
async fn upload_measures_a_single_post() {
    let server = match TestServer::start().await {
        Ok(s) => s,
        Err(err) => panic!("start test server: {err}"),
    };

    let cfg = ProbeConfig::new(server.base_url());
    let probe = SpeedProbe::new(cfg);
    let outcome = probe.upload().await;

    assert!(outcome.aborted.is_none());
    assert!(outcome.speed > 0.0);
    assert_eq!(outcome.attempts_completed, 1);
    assert_eq!(server.stats().uploads_total(), 1);
    assert_eq!(server.stats().upload_bytes_total(), 128 * 1024);

    server.shutdown().await;
}

#[tokio::test]
async fn upload_failure_reports_zero_speed() {
    let mut cfg = ProbeConfig::new(&refused_base_url().await);
    cfg.connect_timeout = Some(Duration::from_millis(300));

    let probe = SpeedProbe::new(cfg);
    let outcome = probe.upload().await;

    assert_eq!(outcome.speed, 0.0);
    assert!(outcome.aborted.is_some());
}

#[tokio::test]
async fn ping_roundtrip_and_failure() {
    let server = match TestServer::start().await {
        Ok(s) => s,
        Err(err) => panic!("start test server: {err}"),
    };

    let probe = SpeedProbe::new(ProbeConfig::new(server.base_url()));
    let ping = probe.ping().await;
    assert!(ping.is_some_and(|ms| ms >= 0.0), "ping={ping:?}");
    assert_eq!(server.stats().pings_total(), 1);
    server.shutdown().await;

    let mut cfg = ProbeConfig::new(&refused_base_url().await);
    cfg.connect_timeout = Some(Duration::from_millis(300));
    let probe = SpeedProbe::new(cfg);
    assert_eq!(probe.ping().await, None);
}
