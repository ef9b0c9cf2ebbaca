//! Scan command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use switchbot_core::ScanOptions;
use switchbot_core::scan::scan_with_options;
use tracing::info;

use crate::cli::OutputFormat;
use crate::format::{FormatOptions, format_scan_json, format_scan_table};
use crate::util::write_output;

pub async fn cmd_scan(
    timeout: u64,
    format: OutputFormat,
    output: Option<&PathBuf>,
    opts: &FormatOptions,
) -> Result<()> {
    info!("Scanning for Bots ({}s)...", timeout);

    let options = ScanOptions::default().duration_secs(timeout);
    let bots = scan_with_options(options)
        .await
        .context("Failed to scan for SwitchBots")?;

    let content = match format {
        OutputFormat::Json => format_scan_json(&bots, opts)?,
        OutputFormat::Table => format_scan_table(&bots, opts),
    };

    write_output(output, &content)
}
