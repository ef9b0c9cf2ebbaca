//! Command-line interface for SwitchBot Bot actuators.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `scan` | Search for nearby Bots |
//! | `press`, `on`, `off`, `up`, `down` | Move the arm |
//! | `info` | Battery, firmware and settings |
//! | `timers` | Configured timer slots |
//! | `alias` | Manage friendly names |
//! | `completions` | Generate shell completions |
//!
//! # Configuration
//!
//! Defaults live in `~/.config/switchbot/config.toml` (or platform
//! equivalent): `timeout`, `max_retry`, `format`, plus `[passwords]` and
//! `[aliases]` tables keyed by address and name. Flags override the
//! `SWITCHBOT_PASSWORD` environment variable, which overrides the file.

use std::io;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use switchbot_core::BotAction;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod config;
mod format;
mod util;

use cli::{ActionArgs, AliasSubcommand, Cli, Commands};
use commands::{AliasAction, cmd_action, cmd_alias, cmd_info, cmd_scan, cmd_timers};
use config::{Config, resolve_format};
use format::FormatOptions;
use util::Target;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Handle completions command early (before tracing init)
    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(shell, &mut cmd, "switchbot", &mut io::stdout());
        return Ok(());
    }

    let filter = if cli.quiet {
        EnvFilter::new("warn")
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let config_path = cli.config.clone().unwrap_or_else(Config::path);
    let config = Config::load(Some(&config_path));
    let opts = FormatOptions::new(cli.style);
    let output = cli.output.as_ref();

    match cli.command {
        Commands::Scan { timeout, format } => {
            cmd_scan(timeout, resolve_format(format, &config), output, &opts).await?;
        }
        Commands::Press(args) => run_action(BotAction::Press, args, &config).await?,
        Commands::On(args) => run_action(BotAction::On, args, &config).await?,
        Commands::Off(args) => run_action(BotAction::Off, args, &config).await?,
        Commands::Up(args) => run_action(BotAction::Up, args, &config).await?,
        Commands::Down(args) => run_action(BotAction::Down, args, &config).await?,
        Commands::Info { device, format } => {
            let target = Target::resolve(device, &config);
            cmd_info(&target, resolve_format(format, &config), output, &opts).await?;
        }
        Commands::Timers {
            device,
            count,
            format,
        } => {
            let target = Target::resolve(device, &config);
            let format = resolve_format(format, &config);
            cmd_timers(&target, count, format, output, &opts).await?;
        }
        Commands::Alias { action } => {
            let action = match action {
                AliasSubcommand::List => AliasAction::List,
                AliasSubcommand::Set { name, address } => AliasAction::Set { name, address },
                AliasSubcommand::Remove { name } => AliasAction::Remove { name },
            };
            cmd_alias(action, &config_path, cli.quiet)?;
        }
        Commands::ConfigPath => println!("{}", config_path.display()),
        Commands::Completions { .. } => unreachable!("handled before tracing init"),
    }

    Ok(())
}

async fn run_action(action: BotAction, args: ActionArgs, config: &Config) -> Result<()> {
    let target = Target::resolve(args.device, config);
    cmd_action(&target, action, !args.no_wait).await
}
