use crate::cli::OutputFormat;
use crate::report::TestReport;
use speedprobe_core::ProgressFn;
use speedprobe_store::{ResultRecord, SpeedKind};

mod human;
mod json;

pub(crate) trait OutputFormatter: Send + Sync {
    fn print_header(&self, target: &str);

    /// Announce the phase about to run; later progress samples belong to it.
    fn begin_phase(&self, kind: SpeedKind);

    fn progress(&self) -> Option<ProgressFn>;

    fn print_report(&self, report: &TestReport) -> anyhow::Result<()>;

    fn print_history(&self, records: &[ResultRecord]) -> anyhow::Result<()>;
}

pub(crate) fn formatter(format: OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::HumanReadable => Box::new(human::HumanReadableOutput::new()),
        OutputFormat::Json => Box::new(json::JsonOutput::new()),
    }
}
