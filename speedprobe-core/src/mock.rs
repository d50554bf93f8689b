use rand::Rng as _;
use std::time::Duration;
use tokio::time::sleep;

/// Randomized results for a demo run without any network traffic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MockOutcome {
    /// 0..200 ms.
    pub ping_ms: f64,
    /// 0..100 Mbps.
    pub download_mbps: f64,
    /// 0..50 Mbps.
    pub upload_mbps: f64,
}

/// Emits mock ping/download/upload results one phase at a time, pausing
/// `phase_delay` before each so the output paces like a real run.
#[derive(Debug, Clone)]
pub struct MockProbe {
    phase_delay: Duration,
}

impl Default for MockProbe {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl MockProbe {
    #[must_use]
    pub fn new(phase_delay: Duration) -> Self {
        Self { phase_delay }
    }

    pub async fn ping(&self) -> f64 {
        sleep(self.phase_delay).await;
        rand::rng().random_range(0..200) as f64
    }

    pub async fn download(&self) -> f64 {
        sleep(self.phase_delay).await;
        rand::rng().random_range(0..100) as f64
    }

    pub async fn upload(&self) -> f64 {
        sleep(self.phase_delay).await;
        rand::rng().random_range(0..50) as f64
    }

    pub async fn run(&self) -> MockOutcome {
        MockOutcome {
            ping_ms: self.ping().await,
            download_mbps: self.download().await,
            upload_mbps: self.upload().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_results_stay_in_range() {
        let probe = MockProbe::new(Duration::from_millis(1));
        for _ in 0..16 {
            let out = probe.run().await;
            assert!((0.0..200.0).contains(&out.ping_ms));
            assert!((0.0..100.0).contains(&out.download_mbps));
            assert!((0.0..50.0).contains(&out.upload_mbps));
        }
    }
}
