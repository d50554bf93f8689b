use anyhow::Context as _;
use std::path::PathBuf;

use crate::cli::HistoryArgs;
use crate::exit_codes::ExitCode;
use crate::output;
use crate::run::DEFAULT_HISTORY_FILE;
use speedprobe_store::HistoryStore;

pub fn history(args: HistoryArgs) -> anyhow::Result<ExitCode> {
    let out = output::formatter(args.output);

    let path = args
        .file
        .unwrap_or_else(|| PathBuf::from(DEFAULT_HISTORY_FILE));
    let store = HistoryStore::open(&path);
    let mut records = store
        .load()
        .with_context(|| format!("failed to read history: {}", path.display()))?;

    if let Some(limit) = args.limit
        && records.len() > limit
    {
        records = records.split_off(records.len() - limit);
    }

    out.print_history(&records)?;
    Ok(ExitCode::Success)
}
