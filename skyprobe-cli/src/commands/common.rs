//! Common types and utilities shared across CLI commands.

use clap::ValueEnum;
use skyprobe::config::{ConcurrencyModel, ConfigFile, EngineConfig};
use skyprobe::raycast::CastStrategy;

use crate::error::CliError;

/// Ray casting strategy selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum StrategyArg {
    /// Straight down; nearest surface below the probe
    Nearest,
    /// Six Earth axes, first axis with a hit wins
    MultiAxis,
    /// Straight down, every surface crossed (capped by raycast.drill_max_hits)
    Drill,
}

impl StrategyArg {
    fn to_strategy(self, config: &ConfigFile) -> CastStrategy {
        match self {
            StrategyArg::Nearest => CastStrategy::NearestSurface,
            StrategyArg::MultiAxis => CastStrategy::MultiAxis,
            StrategyArg::Drill => CastStrategy::Drill {
                max_hits: config.raycast.drill_max_hits,
            },
        }
    }
}

/// Scene sharing model for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum ModelArg {
    /// One scene for all queries, answered in order
    Shared,
    /// A fresh scene per query
    Isolated,
}

impl From<ModelArg> for ConcurrencyModel {
    fn from(model: ModelArg) -> Self {
        match model {
            ModelArg::Shared => ConcurrencyModel::Shared,
            ModelArg::Isolated => ConcurrencyModel::Isolated,
        }
    }
}

/// Resolve engine settings from CLI args and config.
pub fn resolve_engine_config(
    cli_strategy: Option<StrategyArg>,
    cli_model: Option<ModelArg>,
    config: &ConfigFile,
) -> Result<EngineConfig, CliError> {
    // CLI takes precedence, then config
    let mut engine = config.engine_config()?;
    if let Some(strategy) = cli_strategy {
        engine = engine.with_strategy(strategy.to_strategy(config));
    }
    if let Some(model) = cli_model {
        engine = engine.with_model(model.into());
    }
    Ok(engine)
}
