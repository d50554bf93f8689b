use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

fn parse_duration(input: &str) -> Result<Duration, String> {
    let s = input.trim();
    if s.is_empty() {
        return Err("duration cannot be empty (expected e.g. 10s, 250ms, 1m)".to_string());
    }
    humantime::parse_duration(s)
        .map_err(|_| format!("invalid duration '{s}' (expected e.g. 10s, 250ms, 1m)"))
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable gauges and summary.
    HumanReadable,
    /// Emit JSON lines (NDJSON) to stdout.
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "speedprobe",
    author,
    version,
    about = "HTTP internet speed test",
    long_about = "speedprobe measures ping, download and upload throughput against an HTTP file server.\n\nDownloads fetch `{base-url}/files/{size}KB.bin` over a doubling ladder of sizes (128 KB up to 128 MB) and report the average of the valid per-transfer samples in Mbps; uploads POST a 128 KB payload to the upload endpoint.\n\nCompleted measurements are appended to a JSON history file readable via `speedprobe history`.",
    after_help = "Examples:\n  speedprobe run --base-url https://files.example.com\n  speedprobe run --base-url https://files.example.com --duration 10s\n  speedprobe run --base-url http://127.0.0.1:8080 --chunk-size 1024 --cycles 3 --output json\n  speedprobe run --mock\n  speedprobe history --limit 10"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a speed test
    #[command(
        long_about = "Run the ping, download and upload probes in sequence and print a report.\n\nWithout --chunk-size/--cycles the download uses the default size ladder; with both, it runs `cycles` transfers of `chunk-size` KB."
    )]
    Run(RunArgs),

    /// Show past results
    History(HistoryArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Base URL of the file server (downloads fetch {base-url}/files/{size}KB.bin)
    #[arg(long, env = "SPEEDPROBE_BASE_URL", required_unless_present = "mock")]
    pub base_url: Option<String>,

    /// Upload endpoint (defaults to {base-url}/upload)
    #[arg(long)]
    pub upload_url: Option<String>,

    /// Wall-clock budget for the download run (e.g. 10s, 250ms, 1m)
    #[arg(long, value_parser = parse_duration)]
    pub duration: Option<Duration>,

    /// Custom download attempt size in KB (requires --cycles)
    #[arg(long, value_name = "KB", requires = "cycles")]
    pub chunk_size: Option<u64>,

    /// Number of download attempts of --chunk-size KB (requires --chunk-size)
    #[arg(long, requires = "chunk_size")]
    pub cycles: Option<u64>,

    /// TCP connect timeout (default 3s)
    #[arg(long, value_parser = parse_duration)]
    pub connect_timeout: Option<Duration>,

    /// Skip the upload probe
    #[arg(long)]
    pub skip_upload: bool,

    /// Skip the ping probe
    #[arg(long)]
    pub skip_ping: bool,

    /// Emit randomized mock results instead of probing the network
    #[arg(long)]
    pub mock: bool,

    /// Pause between mock phases
    #[arg(long, value_parser = parse_duration, default_value = "1s")]
    pub mock_delay: Duration,

    /// History file to append results to
    #[arg(long, value_name = "PATH")]
    pub history: Option<PathBuf>,

    /// Do not append results to the history file
    #[arg(long, conflicts_with = "history")]
    pub no_history: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::HumanReadable)]
    pub output: OutputFormat,
}

#[derive(Debug, Args)]
pub struct HistoryArgs {
    /// History file to read
    #[arg(long, value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Show only the most recent N records
    #[arg(long)]
    pub limit: Option<usize>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::HumanReadable)]
    pub output: OutputFormat,
}
