use std::sync::{Arc, Mutex};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use speedprobe_core::ProbeOutcome;
use speedprobe_core::ProgressFn;
use speedprobe_store::{ResultRecord, SpeedKind};

use super::OutputFormatter;
use crate::report::TestReport;

pub(crate) struct HumanReadableOutput {
    inner: Arc<Mutex<Inner>>,
}

struct Inner {
    current: Option<ProgressBar>,
}

impl HumanReadableOutput {
    pub(crate) fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner { current: None })),
        }
    }

    fn finish_spinner(&self) {
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(pb) = inner.current.take() {
            pb.finish_and_clear();
        }
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner} {prefix}: {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

impl OutputFormatter for HumanReadableOutput {
    fn print_header(&self, target: &str) {
        eprintln!("speedprobe: testing against {target}");
    }

    fn begin_phase(&self, kind: SpeedKind) {
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(old) = inner.current.take() {
            old.finish_and_clear();
        }

        let pb = ProgressBar::new_spinner();
        pb.set_draw_target(ProgressDrawTarget::stderr_with_hz(5));
        pb.set_style(spinner_style());
        pb.set_prefix(kind.to_string());
        pb.set_message("...");
        pb.enable_steady_tick(Duration::from_millis(120));

        inner.current = Some(pb);
    }

    fn progress(&self) -> Option<ProgressFn> {
        let inner = self.inner.clone();
        Some(Arc::new(move |speed| {
            let guard = inner
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Some(pb) = &guard.current {
                pb.set_message(format!("{speed:.2} Mbps"));
            }
        }))
    }

    fn print_report(&self, report: &TestReport) -> anyhow::Result<()> {
        self.finish_spinner();

        println!("results ({}):", report.started);
        match report.ping_ms {
            Some(ms) => println!("  ping: {ms} ms"),
            None => println!("  ping: n/a"),
        }
        print_outcome("download", report.download.as_ref());
        print_outcome("upload", report.upload.as_ref());

        Ok(())
    }

    fn print_history(&self, records: &[ResultRecord]) -> anyhow::Result<()> {
        if records.is_empty() {
            println!("history: no results");
            return Ok(());
        }

        for record in records {
            println!(
                "{}  {:<8}  {} {}",
                record.date,
                record.label,
                record.value,
                record.label.unit()
            );
        }

        Ok(())
    }
}

fn print_outcome(name: &str, outcome: Option<&ProbeOutcome>) {
    let Some(outcome) = outcome else {
        println!("  {name}: skipped");
        return;
    };

    if let Some(kind) = outcome.aborted {
        println!("  {name}: failed ({kind})");
        return;
    }

    let mut line = format!("  {name}: {} Mbps", outcome.speed);
    if outcome.attempts_completed > 1 {
        line.push_str(&format!(
            " ({} samples, {:.1}s)",
            outcome.valid_samples,
            outcome.elapsed.as_secs_f64()
        ));
    }
    if outcome.attempts_skipped > 0 {
        line.push_str(&format!(" [{} sizes unavailable]", outcome.attempts_skipped));
    }
    println!("{line}");
}
