use anyhow::Context as _;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use crate::cli::RunArgs;
use crate::exit_codes::ExitCode;
use crate::output::{self, OutputFormatter};
use crate::report::TestReport;
use speedprobe_core::{MockProbe, ProbeConfig, ProbeOutcome, SpeedProbe};
use speedprobe_store::{HistoryStore, ResultRecord, SpeedKind};

pub(crate) const DEFAULT_HISTORY_FILE: &str = "speedprobe-results.json";

pub async fn run(args: RunArgs) -> anyhow::Result<ExitCode> {
    let out = output::formatter(args.output);

    let report = if args.mock {
        run_mock(&args, out.as_ref()).await
    } else {
        run_probes(&args, out.as_ref()).await?
    };

    out.print_report(&report)?;

    if !args.no_history {
        let path = args
            .history
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_HISTORY_FILE));
        let store = HistoryStore::open(&path);
        append_history(&store, &report)
            .with_context(|| format!("failed to append history: {}", path.display()))?;
    }

    if report.failed() {
        Ok(ExitCode::ProbeFailed)
    } else {
        Ok(ExitCode::Success)
    }
}

async fn run_probes(args: &RunArgs, out: &dyn OutputFormatter) -> anyhow::Result<TestReport> {
    let base_url = args
        .base_url
        .as_deref()
        .context("--base-url is required unless --mock is set")?;

    let mut cfg = ProbeConfig::new(base_url);
    if let Some(upload_url) = &args.upload_url {
        cfg.upload_url = upload_url.clone();
    }
    cfg.duration_budget = args.duration;
    cfg.chunk_size_kb = args.chunk_size;
    cfg.cycles = args.cycles;
    cfg.connect_timeout = args.connect_timeout;

    let probe = SpeedProbe::new(cfg);
    out.print_header(&probe.config().base_url);

    let started = now_rfc3339();

    let ping_ms = if args.skip_ping {
        None
    } else {
        out.begin_phase(SpeedKind::Ping);
        probe.ping().await
    };

    out.begin_phase(SpeedKind::Download);
    let progress = out.progress();
    let download = probe.download(progress.as_ref()).await;

    let upload = if args.skip_upload {
        None
    } else {
        out.begin_phase(SpeedKind::Upload);
        Some(probe.upload().await)
    };

    Ok(TestReport {
        started,
        ping_ms,
        download: Some(download),
        upload,
    })
}

async fn run_mock(args: &RunArgs, out: &dyn OutputFormatter) -> TestReport {
    let mock = MockProbe::new(args.mock_delay);
    out.print_header("mock");

    let started = now_rfc3339();

    let ping_ms = if args.skip_ping {
        None
    } else {
        out.begin_phase(SpeedKind::Ping);
        Some(mock.ping().await)
    };

    out.begin_phase(SpeedKind::Download);
    let speed = mock.download().await;
    if let Some(progress) = out.progress() {
        progress(speed);
    }
    let download = synthetic_outcome(speed, args.mock_delay);

    let upload = if args.skip_upload {
        None
    } else {
        out.begin_phase(SpeedKind::Upload);
        Some(synthetic_outcome(mock.upload().await, args.mock_delay))
    };

    TestReport {
        started,
        ping_ms,
        download: Some(download),
        upload,
    }
}

fn synthetic_outcome(speed: f64, elapsed: Duration) -> ProbeOutcome {
    ProbeOutcome {
        speed,
        attempts_completed: 1,
        attempts_skipped: 0,
        valid_samples: 1,
        elapsed,
        aborted: None,
    }
}

fn append_history(store: &HistoryStore, report: &TestReport) -> speedprobe_store::Result<()> {
    if let Some(ms) = report.ping_ms {
        store.append(ResultRecord::now(SpeedKind::Ping, ms))?;
    }
    if let Some(outcome) = &report.download {
        store.append(ResultRecord::now(SpeedKind::Download, outcome.speed))?;
    }
    if let Some(outcome) = &report.upload {
        store.append(ResultRecord::now(SpeedKind::Upload, outcome.speed))?;
    }
    Ok(())
}

fn now_rfc3339() -> String {
    humantime::format_rfc3339_seconds(SystemTime::now()).to_string()
}
