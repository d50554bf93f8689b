use std::time::Duration;

/// Default download ladder, in KB (up to 128 MB).
///
/// Sizes double so that tiny, latency-dominated transfers get the same weight
/// in the average as the later bandwidth-dominated ones, unless a duration
/// budget cuts the run short.
pub const SAMPLE_LADDER_KB: [u64; 11] = [
    128, 256, 512, 1024, 2048, 4096, 8192, 16384, 32768, 65536, 131072,
];

/// Fixed payload size for the single-attempt upload probe, in KB.
pub const DEFAULT_UPLOAD_SIZE_KB: u64 = 128;

/// Caller-owned configuration for one probe run. Immutable once a run starts.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Base URL of the file server; download attempts fetch
    /// `{base_url}/files/{size}KB.bin`.
    pub base_url: String,

    /// Endpoint accepting an arbitrary binary POST body.
    pub upload_url: String,

    /// Wall-clock ceiling for the whole download run, checked between
    /// attempts only.
    pub duration_budget: Option<Duration>,

    /// Custom attempt size in KB. Only takes effect together with `cycles`.
    pub chunk_size_kb: Option<u64>,

    /// Number of repetitions of `chunk_size_kb`. Only takes effect together
    /// with `chunk_size_kb`.
    pub cycles: Option<u64>,

    /// TCP connect timeout for the underlying client.
    pub connect_timeout: Option<Duration>,
}

impl ProbeConfig {
    pub fn new(base_url: &str) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        let upload_url = format!("{base_url}/upload");
        Self {
            base_url,
            upload_url,
            duration_budget: None,
            chunk_size_kb: None,
            cycles: None,
            connect_timeout: None,
        }
    }

    pub(crate) fn file_url(&self, size_kb: u64) -> String {
        format!("{}/files/{size_kb}KB.bin", self.base_url)
    }

    pub(crate) fn ping_url(&self) -> String {
        format!("{}/ping", self.base_url)
    }

    /// Attempt size sequence for a download run: `cycles` repetitions of
    /// `chunk_size_kb` when both are configured, the default ladder otherwise.
    pub(crate) fn attempt_sizes_kb(&self) -> Vec<u64> {
        match (self.chunk_size_kb, self.cycles) {
            (Some(chunk), Some(cycles)) => vec![chunk; cycles as usize],
            _ => SAMPLE_LADDER_KB.to_vec(),
        }
    }
}
