mod agg;

use bytes::Bytes;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::{DEFAULT_UPLOAD_SIZE_KB, ProbeConfig};
use crate::http::{HttpClient, HttpRequest, HttpTransportErrorKind};

use agg::{SpeedAgg, mbps, round2};

/// Called with the current running speed (Mbps) after every completed
/// attempt. Runs synchronously between attempts, so it must not block.
pub type ProgressFn = Arc<dyn Fn(f64) + Send + Sync + 'static>;

/// Result of one probe run.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeOutcome {
    /// Reported throughput in Mbps, rounded to two decimals.
    pub speed: f64,

    /// Transfers that completed and produced a timed sample.
    pub attempts_completed: u64,

    /// Attempts skipped because the resource answered with a non-success
    /// status.
    pub attempts_skipped: u64,

    /// Samples that passed the validity predicate and entered the mean.
    pub valid_samples: u64,

    pub elapsed: Duration,

    /// Set when a transport failure aborted the run. The reported speed is 0
    /// and any gathered samples were discarded.
    pub aborted: Option<HttpTransportErrorKind>,
}

impl ProbeOutcome {
    fn aborted(kind: HttpTransportErrorKind, attempts_skipped: u64, elapsed: Duration) -> Self {
        Self {
            speed: 0.0,
            attempts_completed: 0,
            attempts_skipped,
            valid_samples: 0,
            elapsed,
            aborted: Some(kind),
        }
    }
}

/// Drives timed HTTP transfers against a file server and aggregates the
/// per-attempt throughput samples. One instance owns its client and config;
/// runs share no state.
#[derive(Debug, Clone)]
pub struct SpeedProbe {
    client: HttpClient,
    config: ProbeConfig,
}

impl SpeedProbe {
    #[must_use]
    pub fn new(config: ProbeConfig) -> Self {
        let client = match config.connect_timeout {
            Some(timeout) => HttpClient::new(Some(timeout)),
            None => HttpClient::default(),
        };
        Self { client, config }
    }

    #[must_use]
    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Run the download probe: one GET per attempt size, caching disabled,
    /// the clock bracketing the transfer (request through body read) only.
    ///
    /// Status errors skip the attempt and continue; transport errors abort
    /// the whole run with a zero result. The duration budget is checked
    /// between attempts, never mid-transfer.
    pub async fn download(&self, progress: Option<&ProgressFn>) -> ProbeOutcome {
        let run_start = Instant::now();
        let mut agg = SpeedAgg::default();
        let mut completed = 0u64;
        let mut skipped = 0u64;

        for size_kb in self.config.attempt_sizes_kb() {
            let url = self.config.file_url(size_kb);
            let req = HttpRequest::get(&url).header("cache-control", "no-cache");

            let attempt_start = Instant::now();
            let res = match self.client.request(req).await {
                Ok(res) => res,
                Err(err) => {
                    return ProbeOutcome::aborted(
                        err.transport_error_kind(),
                        skipped,
                        run_start.elapsed(),
                    );
                }
            };

            if !res.is_success() {
                skipped += 1;
                continue;
            }

            let duration = attempt_start.elapsed();
            completed += 1;

            let running = agg.record(size_kb, duration);
            if let Some(progress) = progress {
                progress(running);
            }

            if let Some(budget) = self.config.duration_budget
                && run_start.elapsed() > budget
            {
                break;
            }
        }

        ProbeOutcome {
            speed: agg.finish(),
            attempts_completed: completed,
            attempts_skipped: skipped,
            valid_samples: agg.valid_samples(),
            elapsed: run_start.elapsed(),
            aborted: None,
        }
    }

    /// Run the single-attempt upload probe: POST one fixed-size zero-filled
    /// payload. Any failure reports zero speed; there is no retry and no
    /// averaging.
    pub async fn upload(&self) -> ProbeOutcome {
        let size_kb = DEFAULT_UPLOAD_SIZE_KB;
        let payload = Bytes::from(vec![0u8; (size_kb * 1024) as usize]);
        let req = HttpRequest::post(&self.config.upload_url, payload)
            .header("content-type", "application/octet-stream");

        let start = Instant::now();
        match self.client.request(req).await {
            Ok(res) if res.is_success() => {
                let duration = start.elapsed();
                ProbeOutcome {
                    speed: round2(mbps(size_kb, duration)),
                    attempts_completed: 1,
                    attempts_skipped: 0,
                    valid_samples: 1,
                    elapsed: duration,
                    aborted: None,
                }
            }
            Ok(_) => ProbeOutcome {
                speed: 0.0,
                attempts_completed: 0,
                attempts_skipped: 1,
                valid_samples: 0,
                elapsed: start.elapsed(),
                aborted: None,
            },
            Err(err) => {
                ProbeOutcome::aborted(err.transport_error_kind(), 0, start.elapsed())
            }
        }
    }

    /// One timed small GET round trip, in milliseconds. `None` on any
    /// failure.
    pub async fn ping(&self) -> Option<f64> {
        let start = Instant::now();
        match self.client.get(&self.config.ping_url()).await {
            Ok(res) if res.is_success() => Some(round2(start.elapsed().as_secs_f64() * 1000.0)),
            _ => None,
        }
    }
}
