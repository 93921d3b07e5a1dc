//! Runtime configuration for the collision engine.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;

use super::ConfigError;
use crate::classify::Thresholds;
use crate::raycast::CastStrategy;
use crate::readiness::DEFAULT_READINESS_TIMEOUT;

/// Default capacity of the shared-model query queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// How scene instances are shared between queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcurrencyModel {
    /// One scene for the engine lifetime; queries run one at a time.
    #[default]
    Shared,
    /// A fresh scene per query; queries run in parallel.
    Isolated,
}

impl ConcurrencyModel {
    pub fn name(&self) -> &'static str {
        match self {
            ConcurrencyModel::Shared => "shared",
            ConcurrencyModel::Isolated => "isolated",
        }
    }
}

impl fmt::Display for ConcurrencyModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ConcurrencyModel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "shared" | "singleton" => Ok(ConcurrencyModel::Shared),
            "isolated" | "per-query" => Ok(ConcurrencyModel::Isolated),
            _ => Err(ConfigError::InvalidValue {
                key: "engine.model".to_string(),
                value: s.to_string(),
                reason: "expected 'shared' or 'isolated'".to_string(),
            }),
        }
    }
}

/// Everything the engine needs to answer queries.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub strategy: CastStrategy,
    pub thresholds: Thresholds,
    pub model: ConcurrencyModel,
    /// How long a scene may stream before queries go ahead best-effort.
    pub readiness_timeout: Duration,
    pub queue_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            strategy: CastStrategy::default(),
            thresholds: Thresholds::default(),
            model: ConcurrencyModel::default(),
            readiness_timeout: DEFAULT_READINESS_TIMEOUT,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl EngineConfig {
    pub fn with_strategy(mut self, strategy: CastStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_model(mut self, model: ConcurrencyModel) -> Self {
        self.model = model;
        self
    }

    pub fn with_readiness_timeout(mut self, timeout: Duration) -> Self {
        self.readiness_timeout = timeout;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }
}
