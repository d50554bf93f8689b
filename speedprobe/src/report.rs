use speedprobe_core::ProbeOutcome;

/// One completed run, real or mock. Phases that were skipped are `None`.
#[derive(Debug, Clone)]
pub(crate) struct TestReport {
    /// RFC 3339 start timestamp.
    pub started: String,
    pub ping_ms: Option<f64>,
    pub download: Option<ProbeOutcome>,
    pub upload: Option<ProbeOutcome>,
}

impl TestReport {
    /// True when any executed probe was aborted by a transport failure.
    pub(crate) fn failed(&self) -> bool {
        let download_aborted = self
            .download
            .as_ref()
            .is_some_and(|o| o.aborted.is_some());
        let upload_aborted = self.upload.as_ref().is_some_and(|o| o.aborted.is_some());
        download_aborted || upload_aborted
    }
}
