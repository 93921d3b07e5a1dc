//! Init command - initialize configuration file.

use std::path::Path;

use skyprobe::config::{config_file_path, ConfigFile};

use crate::error::CliError;

/// Run the init command.
pub fn run() -> Result<(), CliError> {
    let path = config_file_path();
    let created = write_config(&path)?;

    if created {
        println!("Created configuration file: {}", path.display());
    } else {
        println!("Configuration file: {}", path.display());
        println!("(existing settings kept)");
    }
    println!();
    println!("Point scene.source at a scene descriptor to get started:");
    println!("  skyprobe config set scene.source ./scene.json");
    println!();
    println!("CLI arguments override config file values when specified.");
    Ok(())
}

/// Write defaults, or rewrite an existing file in canonical form.
/// Returns whether the file is new.
fn write_config(path: &Path) -> Result<bool, CliError> {
    let existed = path.exists();
    let config = if existed {
        ConfigFile::load_from(path)?
    } else {
        ConfigFile::default()
    };
    config.save_to(path)?;
    Ok(!existed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creates_default_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("skyprobe").join("config.ini");

        assert!(write_config(&path).unwrap());
        assert_eq!(ConfigFile::load_from(&path).unwrap(), ConfigFile::default());
    }

    #[test]
    fn test_keeps_existing_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");

        let mut config = ConfigFile::default();
        config.scene.source = Some("./city.json".to_string());
        config.save_to(&path).unwrap();

        assert!(!write_config(&path).unwrap());
        let reloaded = ConfigFile::load_from(&path).unwrap();
        assert_eq!(reloaded.scene.source.as_deref(), Some("./city.json"));
    }
}
