use std::time::Duration;

/// A sample only counts toward the average when the transfer took longer than
/// this floor, unless the small-transfer exemption applies.
const VALID_DURATION_FLOOR_SECS: f64 = 0.1;

/// Transfers at or below this size are exempt from the duration floor. Small
/// transfers are inherently fast; excluding them would bias the average
/// toward large-file throughput only.
const SMALL_TRANSFER_KB: u64 = 2048;

/// Throughput in Mbps for a transfer of `size_kb` taking `duration`.
pub(crate) fn mbps(size_kb: u64, duration: Duration) -> f64 {
    let secs = duration.as_secs_f64().max(1e-9);
    (size_kb as f64) / secs / 1024.0 * 8.0
}

pub(crate) fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Running aggregate over one download run. Created fresh per run.
///
/// `total` and the mean stay unrounded internally; rounding happens only in
/// [`SpeedAgg::finish`] so it cannot compound across samples.
#[derive(Debug, Default)]
pub(crate) struct SpeedAgg {
    total: f64,
    valid: u64,
    last_valid: f64,
    last_raw: f64,
}

impl SpeedAgg {
    /// Record one completed attempt and return the value to report to the
    /// progress callback: the most recent valid speed (0.0 before the first
    /// valid sample).
    pub(crate) fn record(&mut self, size_kb: u64, duration: Duration) -> f64 {
        let speed = mbps(size_kb, duration);
        self.last_raw = speed;

        if duration.as_secs_f64() > VALID_DURATION_FLOOR_SECS || size_kb <= SMALL_TRANSFER_KB {
            self.total += speed;
            self.valid += 1;
            self.last_valid = speed;
        }

        self.last_valid
    }

    pub(crate) fn valid_samples(&self) -> u64 {
        self.valid
    }

    /// Final reported speed: the mean of valid samples when any exist,
    /// the last raw sample otherwise (0.0 when nothing completed).
    pub(crate) fn finish(&self) -> f64 {
        if self.valid > 0 {
            round2(self.total / (self.valid as f64))
        } else {
            round2(self.last_raw)
        }
    }
}
