use serde::Serialize;
use std::io::Write as _;
use std::sync::{Arc, Mutex};

use speedprobe_core::{ProbeOutcome, ProgressFn};
use speedprobe_store::{ResultRecord, SpeedKind};

use super::OutputFormatter;
use crate::report::TestReport;

pub(crate) struct JsonOutput {
    phase: Arc<Mutex<SpeedKind>>,
}

impl JsonOutput {
    pub(crate) fn new() -> Self {
        Self {
            phase: Arc::new(Mutex::new(SpeedKind::Download)),
        }
    }
}

impl OutputFormatter for JsonOutput {
    fn print_header(&self, _target: &str) {}

    fn begin_phase(&self, kind: SpeedKind) {
        let mut phase = self
            .phase
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *phase = kind;
    }

    fn progress(&self) -> Option<ProgressFn> {
        let phase = self.phase.clone();
        Some(Arc::new(move |speed| {
            let phase = *phase
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            emit_json_line(&JsonProgressLine {
                kind: "progress",
                phase: phase.to_string(),
                speed,
            });
        }))
    }

    fn print_report(&self, report: &TestReport) -> anyhow::Result<()> {
        emit_json_line(&build_summary_line(report));
        Ok(())
    }

    fn print_history(&self, records: &[ResultRecord]) -> anyhow::Result<()> {
        for record in records {
            emit_json_line(&JsonRecordLine {
                kind: "record",
                label: record.label.to_string(),
                value: record.value,
                date: record.date.clone(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonProgressLine {
    pub kind: &'static str,
    pub phase: String,
    pub speed: f64,
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonOutcome {
    pub speed: f64,
    pub attempts_completed: u64,
    pub attempts_skipped: u64,
    pub valid_samples: u64,
    pub elapsed_seconds: f64,
    pub aborted: Option<String>,
}

impl From<&ProbeOutcome> for JsonOutcome {
    fn from(o: &ProbeOutcome) -> Self {
        Self {
            speed: o.speed,
            attempts_completed: o.attempts_completed,
            attempts_skipped: o.attempts_skipped,
            valid_samples: o.valid_samples,
            elapsed_seconds: o.elapsed.as_secs_f64(),
            aborted: o.aborted.map(|k| k.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonSummaryLine {
    pub kind: &'static str,
    pub started: String,
    pub ping_ms: Option<f64>,
    pub download: Option<JsonOutcome>,
    pub upload: Option<JsonOutcome>,
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonRecordLine {
    pub kind: &'static str,
    pub label: String,
    pub value: f64,
    pub date: String,
}

fn build_summary_line(report: &TestReport) -> JsonSummaryLine {
    JsonSummaryLine {
        kind: "summary",
        started: report.started.clone(),
        ping_ms: report.ping_ms,
        download: report.download.as_ref().map(JsonOutcome::from),
        upload: report.upload.as_ref().map(JsonOutcome::from),
    }
}

fn emit_json_line<T: Serialize>(line: &T) {
    let mut out = std::io::stdout().lock();
    if serde_json::to_writer(&mut out, line).is_ok() {
        let _ = writeln!(out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use std::time::Duration;

    #[test]
    fn progress_line_has_kind_and_phase() {
        let line = JsonProgressLine {
            kind: "progress",
            phase: "Download".to_string(),
            speed: 16.44,
        };

        let v: Value = match serde_json::to_value(&line) {
            Ok(v) => v,
            Err(err) => panic!("to_value failed: {err}"),
        };
        assert_eq!(v.get("kind").and_then(Value::as_str), Some("progress"));
        assert_eq!(v.get("phase").and_then(Value::as_str), Some("Download"));
    }

    #[test]
    fn summary_line_carries_all_phases() {
        let outcome = ProbeOutcome {
            speed: 16.44,
            attempts_completed: 3,
            attempts_skipped: 0,
            valid_samples: 3,
            elapsed: Duration::from_secs(2),
            aborted: None,
        };
        let report = TestReport {
            started: "2026-08-31T00:00:00Z".to_string(),
            ping_ms: Some(42.0),
            download: Some(outcome.clone()),
            upload: Some(outcome),
        };

        let v: Value = match serde_json::to_value(build_summary_line(&report)) {
            Ok(v) => v,
            Err(err) => panic!("to_value failed: {err}"),
        };

        assert_eq!(v.get("kind").and_then(Value::as_str), Some("summary"));
        assert_eq!(v.pointer("/ping_ms").and_then(Value::as_f64), Some(42.0));
        assert_eq!(
            v.pointer("/download/speed").and_then(Value::as_f64),
            Some(16.44)
        );
        assert_eq!(
            v.pointer("/upload/valid_samples").and_then(Value::as_u64),
            Some(3)
        );
        assert!(v.pointer("/download/aborted").is_some_and(Value::is_null));
    }
}
