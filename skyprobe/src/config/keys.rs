//! Dotted `section.key` access to configuration values.

use std::path::PathBuf;
use std::str::FromStr;

use super::file::{parse_key, ConfigFile};
use super::ConfigError;
use crate::raycast::CastStrategy;

/// A settable configuration key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    SceneSource,
    SceneReadinessTimeoutSecs,
    RaycastStrategy,
    RaycastDrillMaxHits,
    CollisionInsideThreshold,
    CollisionNearbyThreshold,
    EngineModel,
    EngineQueueCapacity,
    ServerBind,
    LoggingLevel,
    LoggingDirectory,
}

impl ConfigKey {
    /// Every key, in file order.
    pub fn all() -> &'static [ConfigKey] {
        &[
            ConfigKey::SceneSource,
            ConfigKey::SceneReadinessTimeoutSecs,
            ConfigKey::RaycastStrategy,
            ConfigKey::RaycastDrillMaxHits,
            ConfigKey::CollisionInsideThreshold,
            ConfigKey::CollisionNearbyThreshold,
            ConfigKey::EngineModel,
            ConfigKey::EngineQueueCapacity,
            ConfigKey::ServerBind,
            ConfigKey::LoggingLevel,
            ConfigKey::LoggingDirectory,
        ]
    }

    pub fn section(&self) -> &'static str {
        match self {
            ConfigKey::SceneSource | ConfigKey::SceneReadinessTimeoutSecs => "scene",
            ConfigKey::RaycastStrategy | ConfigKey::RaycastDrillMaxHits => "raycast",
            ConfigKey::CollisionInsideThreshold | ConfigKey::CollisionNearbyThreshold => {
                "collision"
            }
            ConfigKey::EngineModel | ConfigKey::EngineQueueCapacity => "engine",
            ConfigKey::ServerBind => "server",
            ConfigKey::LoggingLevel | ConfigKey::LoggingDirectory => "logging",
        }
    }

    pub fn key_name(&self) -> &'static str {
        match self {
            ConfigKey::SceneSource => "source",
            ConfigKey::SceneReadinessTimeoutSecs => "readiness_timeout_secs",
            ConfigKey::RaycastStrategy => "strategy",
            ConfigKey::RaycastDrillMaxHits => "drill_max_hits",
            ConfigKey::CollisionInsideThreshold => "inside_threshold",
            ConfigKey::CollisionNearbyThreshold => "nearby_threshold",
            ConfigKey::EngineModel => "model",
            ConfigKey::EngineQueueCapacity => "queue_capacity",
            ConfigKey::ServerBind => "bind",
            ConfigKey::LoggingLevel => "level",
            ConfigKey::LoggingDirectory => "directory",
        }
    }

    /// Full dotted name, e.g. `collision.inside_threshold`.
    pub fn name(&self) -> String {
        format!("{}.{}", self.section(), self.key_name())
    }

    /// Current value as text; empty when unset.
    pub fn get(&self, config: &ConfigFile) -> String {
        match self {
            ConfigKey::SceneSource => config.scene.source.clone().unwrap_or_default(),
            ConfigKey::SceneReadinessTimeoutSecs => config.scene.readiness_timeout_secs.to_string(),
            ConfigKey::RaycastStrategy => config.raycast.strategy.name().to_string(),
            ConfigKey::RaycastDrillMaxHits => config.raycast.drill_max_hits.to_string(),
            ConfigKey::CollisionInsideThreshold => config.collision.inside_threshold.to_string(),
            ConfigKey::CollisionNearbyThreshold => config.collision.nearby_threshold.to_string(),
            ConfigKey::EngineModel => config.engine.model.name().to_string(),
            ConfigKey::EngineQueueCapacity => config.engine.queue_capacity.to_string(),
            ConfigKey::ServerBind => config.server.bind.to_string(),
            ConfigKey::LoggingLevel => config.logging.level.clone(),
            ConfigKey::LoggingDirectory => config
                .logging
                .directory
                .as_ref()
                .map(|d| d.display().to_string())
                .unwrap_or_default(),
        }
    }

    /// Parse and store a value. The config is left untouched on error.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigError> {
        let name = self.name();
        let value = value.trim();
        let mut next = config.clone();

        match self {
            ConfigKey::SceneSource => {
                next.scene.source = (!value.is_empty()).then(|| value.to_string());
            }
            ConfigKey::SceneReadinessTimeoutSecs => {
                next.scene.readiness_timeout_secs = parse_key(&name, value)?;
            }
            ConfigKey::RaycastStrategy => {
                next.raycast.strategy = parse_key::<CastStrategy>(&name, value)?;
            }
            ConfigKey::RaycastDrillMaxHits => {
                next.raycast.drill_max_hits = parse_key(&name, value)?;
            }
            ConfigKey::CollisionInsideThreshold => {
                next.collision.inside_threshold = parse_key(&name, value)?;
            }
            ConfigKey::CollisionNearbyThreshold => {
                next.collision.nearby_threshold = parse_key(&name, value)?;
            }
            ConfigKey::EngineModel => next.engine.model = value.parse()?,
            ConfigKey::EngineQueueCapacity => {
                next.engine.queue_capacity = parse_key(&name, value)?;
            }
            ConfigKey::ServerBind => next.server.bind = parse_key(&name, value)?,
            ConfigKey::LoggingLevel => next.logging.level = value.to_string(),
            ConfigKey::LoggingDirectory => {
                next.logging.directory = (!value.is_empty()).then(|| PathBuf::from(value));
            }
        }

        next.validate()?;
        *config = next;
        Ok(())
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ConfigKey::all()
            .iter()
            .copied()
            .find(|k| k.name() == wanted)
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}
