//! Configuration management CLI commands.
//!
//! `config get`, `config set`, `config list` and `config path`.

use std::path::Path;

use clap::Subcommand;
use console::style;
use skyprobe::config::{config_file_path, ConfigFile, ConfigKey};

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Get a configuration value
    Get {
        /// Configuration key in format section.key (e.g., collision.inside_threshold)
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key in format section.key (e.g., collision.inside_threshold)
        key: String,

        /// Value to set; empty clears optional values
        value: String,
    },

    /// List all configuration settings, marking values changed from the defaults
    List,

    /// Show the configuration file path
    Path,
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands) -> Result<(), CliError> {
    let path = config_file_path();
    match command {
        ConfigCommands::Get { key } => {
            println!("{}", get_value(&path, &key)?);
            Ok(())
        }
        ConfigCommands::Set { key, value } => {
            let config_key = set_value(&path, &key, &value)?;
            println!("Set {} = {}", config_key.name(), value.trim());
            Ok(())
        }
        ConfigCommands::List => run_list(&path),
        ConfigCommands::Path => {
            println!("{}", path.display());
            Ok(())
        }
    }
}

fn parse_key(key: &str) -> Result<ConfigKey, CliError> {
    key.parse().map_err(|_| {
        CliError::Config(format!(
            "Unknown configuration key '{}'. Use 'skyprobe config list' to see available keys.",
            key
        ))
    })
}

fn load(path: &Path) -> Result<ConfigFile, CliError> {
    if path.exists() {
        Ok(ConfigFile::load_from(path)?)
    } else {
        Ok(ConfigFile::default())
    }
}

fn get_value(path: &Path, key: &str) -> Result<String, CliError> {
    let config_key = parse_key(key)?;
    let value = config_key.get(&load(path)?);
    Ok(if value.is_empty() {
        "(not set)".to_string()
    } else {
        value
    })
}

/// Validate and persist one value. The file is not written on error.
fn set_value(path: &Path, key: &str, value: &str) -> Result<ConfigKey, CliError> {
    let config_key = parse_key(key)?;
    let mut config = load(path)?;
    config_key.set(&mut config, value)?;
    config.save_to(path)?;
    Ok(config_key)
}

fn run_list(path: &Path) -> Result<(), CliError> {
    let config = load(path)?;
    let defaults = ConfigFile::default();

    println!("Configuration Settings");
    println!("======================");
    println!();

    let mut current_section = "";

    for key in ConfigKey::all() {
        let section = key.section();

        if section != current_section {
            if !current_section.is_empty() {
                println!();
            }
            println!("[{}]", section);
            current_section = section;
        }

        let value = key.get(&config);
        let shown = if value.is_empty() {
            style("(not set)".to_string()).dim()
        } else if value != key.get(&defaults) {
            style(value).cyan().bold()
        } else {
            style(value)
        };
        println!("  {} = {}", key.key_name(), shown);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");

        set_value(&path, "raycast.strategy", "multi-axis").unwrap();
        assert_eq!(get_value(&path, "raycast.strategy").unwrap(), "multi-axis");
        assert_eq!(get_value(&path, "scene.source").unwrap(), "(not set)");
    }

    #[test]
    fn test_invalid_value_leaves_file_unwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");

        assert!(set_value(&path, "collision.inside_threshold", "900").is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_unknown_key() {
        let dir = tempfile::tempdir().unwrap();
        let err = get_value(&dir.path().join("config.ini"), "cache.size").unwrap_err();
        assert!(err.to_string().contains("skyprobe config list"));
    }
}
