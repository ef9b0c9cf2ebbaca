//! Timers command implementation.

use std::path::PathBuf;

use anyhow::Result;
use switchbot_core::{BleTransport, Session};

use crate::cli::OutputFormat;
use crate::format::{FormatOptions, format_timers_json, format_timers_table};
use crate::util::{Target, write_output};

pub async fn cmd_timers(
    target: &Target,
    count: Option<u8>,
    format: OutputFormat,
    output: Option<&PathBuf>,
    opts: &FormatOptions,
) -> Result<()> {
    let timers = target
        .run("timers", async |session: &mut Session<BleTransport>| {
            match count {
                Some(count) => session.get_timers(count).await,
                None => session.get_all_timers().await,
            }
        })
        .await?;

    let content = match format {
        OutputFormat::Json => format_timers_json(&timers, opts)?,
        OutputFormat::Table => format_timers_table(&timers, opts),
    };

    write_output(output, &content)
}
