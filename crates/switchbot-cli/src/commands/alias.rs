//! Alias command implementation.
//!
//! Manages friendly Bot names (aliases) that map to addresses.

use std::path::Path;

use anyhow::{Result, bail};
use tabled::{builder::Builder, settings::Style};

use crate::config::Config;

/// Alias subcommand actions
pub enum AliasAction {
    /// List all aliases
    List,
    /// Set an alias
    Set { name: String, address: String },
    /// Remove an alias
    Remove { name: String },
}

/// Apply `action` to the config file at `path`.
pub fn cmd_alias(action: AliasAction, path: &Path, quiet: bool) -> Result<()> {
    let mut config = Config::load(Some(path));

    match action {
        AliasAction::List => {
            if config.aliases.is_empty() {
                if !quiet {
                    println!("No aliases configured.");
                    println!();
                    println!("Add an alias with: switchbot alias set <name> <address>");
                }
            } else {
                let mut builder = Builder::default();
                builder.push_record(["Alias", "Address"]);

                let mut aliases: Vec<_> = config.aliases.iter().collect();
                aliases.sort_by_key(|(name, _)| name.as_str());
                for (name, address) in aliases {
                    builder.push_record([name.as_str(), address.as_str()]);
                }

                let mut table = builder.build();
                table.with(Style::rounded());
                println!("{}", table);
            }
        }
        AliasAction::Set { name, address } => {
            if looks_like_address(&name) {
                bail!(
                    "Alias name '{}' looks like a Bot address. \
                     Use a friendly name instead (e.g., 'kitchen', 'desk-lamp').",
                    name
                );
            }

            let was_update = config.aliases.contains_key(&name);
            config.aliases.insert(name.clone(), address.clone());
            config.save_to(path)?;

            if !quiet {
                let verb = if was_update { "Updated" } else { "Added" };
                println!("{} alias '{}' -> {}", verb, name, address);
            }
        }
        AliasAction::Remove { name } => {
            if config.aliases.remove(&name).is_none() {
                bail!("Alias '{}' not found", name);
            }
            config.save_to(path)?;
            if !quiet {
                println!("Removed alias '{}'", name);
            }
        }
    }

    Ok(())
}

/// Check if a string looks like a Bot address (MAC or UUID).
fn looks_like_address(s: &str) -> bool {
    let mac_pattern = s.chars().filter(|c| *c == ':' || *c == '-').count() >= 5
        && s.chars().all(|c| c.is_ascii_hexdigit() || c == ':' || c == '-');

    // CoreBluetooth UUIDs
    let uuid_pattern = s.len() >= 32 && s.chars().all(|c| c.is_ascii_hexdigit() || c == '-');

    mac_pattern || uuid_pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_looks_like_address() {
        assert!(looks_like_address("AA:BB:CC:DD:EE:FF"));
        assert!(looks_like_address("aa-bb-cc-dd-ee-ff"));
        assert!(looks_like_address("12345678-1234-1234-1234-123456789abc"));
        assert!(!looks_like_address("kitchen"));
        assert!(!looks_like_address("desk-lamp"));
        assert!(!looks_like_address("AA:BB:CC"));
        assert!(!looks_like_address(""));
    }

    #[test]
    fn test_set_and_remove_alias() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        cmd_alias(
            AliasAction::Set {
                name: "kitchen".to_string(),
                address: "AA:BB:CC:DD:EE:FF".to_string(),
            },
            &path,
            true,
        )
        .unwrap();
        assert_eq!(
            Config::load(Some(&path)).aliases.get("kitchen").map(String::as_str),
            Some("AA:BB:CC:DD:EE:FF")
        );

        cmd_alias(
            AliasAction::Remove {
                name: "kitchen".to_string(),
            },
            &path,
            true,
        )
        .unwrap();
        assert!(Config::load(Some(&path)).aliases.is_empty());
    }

    #[test]
    fn test_set_rejects_address_as_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let result = cmd_alias(
            AliasAction::Set {
                name: "AA:BB:CC:DD:EE:FF".to_string(),
                address: "AA:BB:CC:DD:EE:FF".to_string(),
            },
            &path,
            true,
        );
        assert!(result.is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_remove_unknown_alias_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let result = cmd_alias(
            AliasAction::Remove {
                name: "nope".to_string(),
            },
            &path,
            true,
        );
        assert!(result.is_err());
    }
}
