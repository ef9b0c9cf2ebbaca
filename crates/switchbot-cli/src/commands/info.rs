//! Info command implementation.

use std::path::PathBuf;

use anyhow::Result;
use switchbot_core::{BleTransport, Session};

use crate::cli::OutputFormat;
use crate::format::{FormatOptions, format_info_json, format_info_table};
use crate::util::{Target, write_output};

pub async fn cmd_info(
    target: &Target,
    format: OutputFormat,
    output: Option<&PathBuf>,
    opts: &FormatOptions,
) -> Result<()> {
    let info = target
        .run("info", async |session: &mut Session<BleTransport>| {
            session.get_info().await
        })
        .await?;

    let content = match format {
        OutputFormat::Json => format_info_json(&info, opts)?,
        OutputFormat::Table => format_info_table(&info, opts),
    };

    write_output(output, &content)
}
