use std::{fs, path::Path};

use anyhow::Context;
use flow::SessionReport;
use tracing::info;

pub fn write_report(path: &Path, report: &SessionReport<'_>) -> anyhow::Result<()> {
    let json =
        serde_json::to_string_pretty(report).context("failed to serialize session results")?;
    fs::write(path, json)
        .with_context(|| format!("failed to write session results to {}", path.display()))?;
    info!(
        path = %path.display(),
        session_id = %report.session_id,
        records = report.results.len(),
        finished = report.finished,
        "session results written"
    );
    Ok(())
}

#[cfg(test)]
#[path = "tests/results_tests.rs"]
mod tests;
