//! INI configuration file.
//!
//! Lives at `<config dir>/skyprobe/config.ini`. Missing keys fall back to
//! defaults, so an empty file is a valid configuration.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::Ini;

use super::engine::{ConcurrencyModel, EngineConfig, DEFAULT_QUEUE_CAPACITY};
use super::ConfigError;
use crate::classify::{Thresholds, DEFAULT_INSIDE_THRESHOLD_M, DEFAULT_NEARBY_THRESHOLD_M};
use crate::logging::LoggingConfig;
use crate::raycast::{CastStrategy, DEFAULT_DRILL_MAX_HITS};
use crate::readiness::DEFAULT_READINESS_TIMEOUT;

/// Default HTTP port, bound on loopback.
pub const DEFAULT_PORT: u16 = 3000;

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Path of the user configuration file.
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("skyprobe")
        .join("config.ini")
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneSettings {
    /// Descriptor path or URL.
    pub source: Option<String>,
    pub readiness_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RaycastSettings {
    pub strategy: CastStrategy,
    pub drill_max_hits: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollisionSettings {
    pub inside_threshold: f64,
    pub nearby_threshold: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    pub model: ConcurrencyModel,
    pub queue_capacity: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerSettings {
    pub bind: SocketAddr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    pub level: String,
    /// Log file directory; `None` logs to stderr only.
    pub directory: Option<PathBuf>,
}

/// Parsed configuration file.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    pub scene: SceneSettings,
    pub raycast: RaycastSettings,
    pub collision: CollisionSettings,
    pub engine: EngineSettings,
    pub server: ServerSettings,
    pub logging: LoggingSettings,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            scene: SceneSettings {
                source: None,
                readiness_timeout_secs: DEFAULT_READINESS_TIMEOUT.as_secs(),
            },
            raycast: RaycastSettings {
                strategy: CastStrategy::NearestSurface,
                drill_max_hits: DEFAULT_DRILL_MAX_HITS,
            },
            collision: CollisionSettings {
                inside_threshold: DEFAULT_INSIDE_THRESHOLD_M,
                nearby_threshold: DEFAULT_NEARBY_THRESHOLD_M,
            },
            engine: EngineSettings {
                model: ConcurrencyModel::Shared,
                queue_capacity: DEFAULT_QUEUE_CAPACITY,
            },
            server: ServerSettings {
                bind: SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)),
            },
            logging: LoggingSettings {
                level: DEFAULT_LOG_LEVEL.to_string(),
                directory: None,
            },
        }
    }
}

impl ConfigFile {
    /// Load from the default location. A missing file yields defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_file_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_file(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ini(&ini)
    }

    /// Parse INI text.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(v) = value(ini, "scene", "source") {
            config.scene.source = Some(v.to_string());
        }
        if let Some(v) = value(ini, "scene", "readiness_timeout_secs") {
            config.scene.readiness_timeout_secs = parse_key("scene.readiness_timeout_secs", v)?;
        }
        if let Some(v) = value(ini, "raycast", "strategy") {
            config.raycast.strategy = parse_key("raycast.strategy", v)?;
        }
        if let Some(v) = value(ini, "raycast", "drill_max_hits") {
            config.raycast.drill_max_hits = parse_key("raycast.drill_max_hits", v)?;
        }
        if let Some(v) = value(ini, "collision", "inside_threshold") {
            config.collision.inside_threshold = parse_key("collision.inside_threshold", v)?;
        }
        if let Some(v) = value(ini, "collision", "nearby_threshold") {
            config.collision.nearby_threshold = parse_key("collision.nearby_threshold", v)?;
        }
        if let Some(v) = value(ini, "engine", "model") {
            config.engine.model = v.parse()?;
        }
        if let Some(v) = value(ini, "engine", "queue_capacity") {
            config.engine.queue_capacity = parse_key("engine.queue_capacity", v)?;
        }
        if let Some(v) = value(ini, "server", "bind") {
            config.server.bind = parse_key("server.bind", v)?;
        }
        if let Some(v) = value(ini, "logging", "level") {
            config.logging.level = v.to_string();
        }
        if let Some(v) = value(ini, "logging", "directory") {
            config.logging.directory = Some(PathBuf::from(v));
        }

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.thresholds()?;
        if self.raycast.drill_max_hits == 0 {
            return Err(ConfigError::InvalidValue {
                key: "raycast.drill_max_hits".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn thresholds(&self) -> Result<Thresholds, ConfigError> {
        Ok(Thresholds::new(
            self.collision.inside_threshold,
            self.collision.nearby_threshold,
        )?)
    }

    /// Cast strategy with the configured drill cap applied.
    pub fn strategy(&self) -> CastStrategy {
        match self.raycast.strategy {
            CastStrategy::Drill { .. } => CastStrategy::Drill {
                max_hits: self.raycast.drill_max_hits,
            },
            other => other,
        }
    }

    /// Engine settings derived from this file.
    pub fn engine_config(&self) -> Result<EngineConfig, ConfigError> {
        Ok(EngineConfig::default()
            .with_strategy(self.strategy())
            .with_thresholds(self.thresholds()?)
            .with_model(self.engine.model)
            .with_readiness_timeout(Duration::from_secs(self.scene.readiness_timeout_secs))
            .with_queue_capacity(self.engine.queue_capacity))
    }

    pub fn logging_config(&self) -> LoggingConfig {
        LoggingConfig {
            level: self.logging.level.clone(),
            directory: self.logging.directory.clone(),
            ..LoggingConfig::default()
        }
    }

    /// Save to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_file_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        }
        self.to_ini()
            .write_to_file(path)
            .map_err(|source| ConfigError::Write {
                path: path.to_path_buf(),
                source,
            })
    }

    fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();
        ini.with_section(Some("scene"))
            .set("source", self.scene.source.clone().unwrap_or_default())
            .set(
                "readiness_timeout_secs",
                self.scene.readiness_timeout_secs.to_string(),
            );
        ini.with_section(Some("raycast"))
            .set("strategy", self.raycast.strategy.name())
            .set("drill_max_hits", self.raycast.drill_max_hits.to_string());
        ini.with_section(Some("collision"))
            .set("inside_threshold", self.collision.inside_threshold.to_string())
            .set("nearby_threshold", self.collision.nearby_threshold.to_string());
        ini.with_section(Some("engine"))
            .set("model", self.engine.model.name())
            .set("queue_capacity", self.engine.queue_capacity.to_string());
        ini.with_section(Some("server"))
            .set("bind", self.server.bind.to_string());
        ini.with_section(Some("logging"))
            .set("level", self.logging.level.clone())
            .set(
                "directory",
                self.logging
                    .directory
                    .as_ref()
                    .map(|d| d.display().to_string())
                    .unwrap_or_default(),
            );
        ini
    }
}

/// Non-empty value with any trailing inline comment removed.
fn value<'a>(ini: &'a Ini, section: &str, key: &str) -> Option<&'a str> {
    let raw = ini.section(Some(section))?.get(key)?;
    let cleaned = [" ;", " #", "\t;", "\t#"]
        .iter()
        .filter_map(|marker| raw.find(marker))
        .min()
        .map_or(raw, |idx| &raw[..idx])
        .trim();
    (!cleaned.is_empty()).then_some(cleaned)
}

pub(super) fn parse_key<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(ConfigFile::parse("").unwrap(), ConfigFile::default());
    }

    #[test]
    fn test_parse_full_file_with_comments() {
        let text = r#"
[scene]
source = ./scene.json
readiness_timeout_secs = 5

[raycast]
strategy = drill        ; nearest | multi-axis | drill
drill_max_hits = 4

[collision]
inside_threshold = 200
nearby_threshold = 500

[engine]
model = isolated
queue_capacity = 16

[server]
bind = 0.0.0.0:8080

[logging]
level = debug
directory =
"#;
        let config = ConfigFile::parse(text).unwrap();
        assert_eq!(config.scene.source.as_deref(), Some("./scene.json"));
        assert_eq!(config.strategy(), CastStrategy::Drill { max_hits: 4 });
        assert_eq!(config.engine.model, ConcurrencyModel::Isolated);
        assert_eq!(config.server.bind.port(), 8080);
        assert_eq!(config.logging.directory, None);

        let engine = config.engine_config().unwrap();
        assert_eq!(engine.readiness_timeout, Duration::from_secs(5));
        assert_eq!(engine.thresholds.nearby(), 500.0);
        assert_eq!(engine.queue_capacity, 16);
    }

    #[test]
    fn test_invalid_value_names_key() {
        let err = ConfigFile::parse("[engine]\nqueue_capacity = lots\n").unwrap_err();
        match err {
            ConfigError::InvalidValue { key, value, .. } => {
                assert_eq!(key, "engine.queue_capacity");
                assert_eq!(value, "lots");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let text = "[collision]\ninside_threshold = 300\nnearby_threshold = 200\n";
        assert!(matches!(
            ConfigFile::parse(text),
            Err(ConfigError::Thresholds(_))
        ));
    }

    #[test]
    fn test_zero_drill_cap_rejected() {
        assert!(ConfigFile::parse("[raycast]\ndrill_max_hits = 0\n").is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.ini");

        let mut config = ConfigFile::default();
        config.scene.source = Some("https://example.com/scene.json".into());
        config.raycast.strategy = CastStrategy::MultiAxis;
        config.logging.directory = Some(dir.path().join("logs"));
        config.save_to(&path).unwrap();

        let reloaded = ConfigFile::load_from(&path).unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let dir = TempDir::new().unwrap();
        let err = ConfigFile::load_from(&dir.path().join("absent.ini")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
