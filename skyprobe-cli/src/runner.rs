//! Shared setup for commands that talk to a scene.
//!
//! Loads the config file, installs logging, and builds the tokio runtime,
//! scene source and engine from config plus CLI overrides.

use std::sync::Arc;

use skyprobe::config::{config_file_path, ConfigFile, EngineConfig};
use skyprobe::logging::{init_logging, LoggingGuard};
use skyprobe::scene::{AssetLocation, DescriptorSceneSource, SceneSource};
use skyprobe::CollisionEngine;
use tokio::runtime::Runtime;
use tracing::info;

use crate::error::CliError;

pub struct CliRunner {
    config: ConfigFile,
    runtime: Runtime,
    _logging: LoggingGuard,
}

impl CliRunner {
    pub fn new() -> Result<Self, CliError> {
        let config = ConfigFile::load()?;
        let logging = init_logging(&config.logging_config())?;
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("skyprobe")
            .build()?;

        Ok(Self {
            config,
            runtime,
            _logging: logging,
        })
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn log_startup(&self, command: &str) {
        info!(
            version = skyprobe::VERSION,
            command,
            config = %config_file_path().display(),
            "SkyProbe starting"
        );
    }

    /// Scene source from `--scene`, falling back to `scene.source` in the config.
    pub fn scene_source(&self, cli_scene: Option<String>) -> Result<Arc<dyn SceneSource>, CliError> {
        let location = cli_scene
            .or_else(|| self.config.scene.source.clone())
            .ok_or_else(|| {
                CliError::Config(
                    "No scene configured. Pass --scene or set scene.source \
                     (e.g. 'skyprobe config set scene.source ./scene.json')."
                        .to_string(),
                )
            })?;

        let location: AssetLocation = location
            .parse()
            .map_err(|e| CliError::Config(format!("Invalid scene location: {}", e)))?;

        let source = DescriptorSceneSource::new(location)
            .map_err(|e| CliError::Config(format!("Failed to create scene source: {}", e)))?;
        Ok(Arc::new(source))
    }

    pub fn create_engine(
        &self,
        config: EngineConfig,
        source: Arc<dyn SceneSource>,
    ) -> Arc<CollisionEngine> {
        Arc::new(CollisionEngine::new(config, source))
    }
}
