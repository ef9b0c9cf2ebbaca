//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Output format for commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// Visual styling mode for tables
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum StyleMode {
    /// Rounded borders (default)
    #[default]
    Rich,
    /// Whitespace-separated columns (for scripting)
    Plain,
}

/// Reusable device connection arguments
#[derive(Debug, Clone, Args)]
pub struct DeviceArgs {
    /// Bot address (MAC address, macOS UUID, or alias from the config file)
    pub address: String,

    /// Connection timeout in seconds [default: 10]
    #[arg(short = 'T', long)]
    pub timeout: Option<u64>,

    /// Maximum retry count; each retry reconnects [default: 0]
    #[arg(short = 'r', long)]
    pub max_retry: Option<u32>,

    /// Password set in the SwitchBot app
    #[arg(short, long, env = "SWITCHBOT_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

/// Arguments shared by the arm commands
#[derive(Debug, Clone, Args)]
pub struct ActionArgs {
    #[command(flatten)]
    pub device: DeviceArgs,

    /// Return once the command is written, without waiting for the Bot's reply
    #[arg(long)]
    pub no_wait: bool,
}

#[derive(Parser)]
#[command(name = "switchbot")]
#[command(author, version, about = "CLI for SwitchBot Bot actuators", long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Use this config file instead of the default location
    #[arg(long, global = true, env = "SWITCHBOT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Table styling
    #[arg(long, global = true, value_enum, default_value = "rich")]
    pub style: StyleMode,

    /// Write output to file instead of stdout
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search for nearby Bots
    Scan {
        /// Scan timeout in seconds
        #[arg(short = 'T', long, default_value = "10")]
        timeout: u64,

        /// Output format [default: table]
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Press and release the arm
    Press(ActionArgs),

    /// Switch on (on/off mode)
    On(ActionArgs),

    /// Switch off (on/off mode)
    Off(ActionArgs),

    /// Retract the arm
    Up(ActionArgs),

    /// Extend the arm
    Down(ActionArgs),

    /// Show battery, firmware and settings
    Info {
        #[command(flatten)]
        device: DeviceArgs,

        /// Output format [default: table]
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Show configured timers
    Timers {
        #[command(flatten)]
        device: DeviceArgs,

        /// Number of slots to read (defaults to the Bot's timer count)
        #[arg(short = 'n', long)]
        count: Option<u8>,

        /// Output format [default: table]
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Manage Bot aliases (friendly names)
    Alias {
        #[command(subcommand)]
        action: AliasSubcommand,
    },

    /// Show the config file path
    ConfigPath,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Alias subcommands
#[derive(Debug, Clone, Subcommand)]
pub enum AliasSubcommand {
    /// List all aliases
    List,

    /// Set an alias
    Set {
        /// Friendly name for the Bot (e.g., "kitchen-light")
        name: String,

        /// Bot address (MAC address or UUID)
        address: String,
    },

    /// Remove an alias
    #[command(alias = "rm")]
    Remove {
        /// Alias name to remove
        name: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_press_defaults() {
        let cli = Cli::try_parse_from(["switchbot", "press", "AA:BB:CC:DD:EE:FF"]).unwrap();
        let Commands::Press(args) = cli.command else {
            panic!("expected press");
        };
        assert_eq!(args.device.address, "AA:BB:CC:DD:EE:FF");
        assert!(args.device.timeout.is_none());
        assert!(args.device.max_retry.is_none());
        assert!(!args.no_wait);
    }

    #[test]
    fn test_parse_action_flags() {
        let cli = Cli::try_parse_from([
            "switchbot",
            "down",
            "kitchen",
            "--timeout",
            "20",
            "--max-retry",
            "3",
            "--no-wait",
        ])
        .unwrap();
        let Commands::Down(args) = cli.command else {
            panic!("expected down");
        };
        assert_eq!(args.device.address, "kitchen");
        assert_eq!(args.device.timeout, Some(20));
        assert_eq!(args.device.max_retry, Some(3));
        assert!(args.no_wait);
    }

    #[test]
    fn test_parse_info_format() {
        let cli = Cli::try_parse_from(["switchbot", "info", "bot", "--format", "json"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Info {
                format: Some(OutputFormat::Json),
                ..
            }
        ));
    }

    #[test]
    fn test_parse_rejects_unknown_format() {
        assert!(Cli::try_parse_from(["switchbot", "info", "bot", "--format", "csv"]).is_err());
    }

    #[test]
    fn test_action_requires_address() {
        assert!(Cli::try_parse_from(["switchbot", "press"]).is_err());
    }

    #[test]
    fn test_parse_alias_remove_shorthand() {
        let cli = Cli::try_parse_from(["switchbot", "alias", "rm", "kitchen"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Alias {
                action: AliasSubcommand::Remove { .. }
            }
        ));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["switchbot", "scan", "-q"]).unwrap();
        assert!(cli.quiet);
        assert!(matches!(cli.command, Commands::Scan { timeout: 10, .. }));
    }
}
