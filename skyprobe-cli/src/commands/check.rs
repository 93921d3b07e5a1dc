//! Check command - classify a single position.

use clap::Args;
use console::style;
use skyprobe::{CollisionResult, CollisionVerdict, GeodeticInput};

use super::common::{resolve_engine_config, ModelArg, StrategyArg};
use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the check command.
#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Longitude in degrees, -180 to 180
    #[arg(long, allow_hyphen_values = true)]
    pub lon: f64,

    /// Latitude in degrees, -90 to 90
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,

    /// Height above the WGS84 ellipsoid in metres
    #[arg(long, allow_hyphen_values = true)]
    pub height: f64,

    /// Scene descriptor path or URL (overrides scene.source)
    #[arg(long)]
    pub scene: Option<String>,

    /// Ray casting strategy (overrides raycast.strategy)
    #[arg(long, value_enum)]
    pub strategy: Option<StrategyArg>,

    /// Print the full result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Run the check command.
pub fn run(args: CheckArgs) -> Result<(), CliError> {
    let runner = CliRunner::new()?;
    runner.log_startup("check");

    // A single query never benefits from a long-lived scene.
    let config = resolve_engine_config(args.strategy, Some(ModelArg::Isolated), runner.config())?;
    let source = runner.scene_source(args.scene)?;
    let engine = runner.create_engine(config, source);

    let input = GeodeticInput {
        longitude: args.lon,
        latitude: args.lat,
        height: args.height,
    };

    let result = runner.runtime().block_on(async {
        let scene = engine.initialize_scene().await?;
        engine.check_collision(&scene, input).await
    })?;
    engine.shutdown();

    if args.json {
        let text = serde_json::to_string_pretty(&result)
            .map_err(|e| CliError::Config(format!("Failed to encode result: {}", e)))?;
        println!("{}", text);
    } else {
        print_result(&result);
    }
    Ok(())
}

fn print_result(result: &CollisionResult) {
    let verdict = match result.verdict {
        CollisionVerdict::Inside(_) => style(result.verdict.to_string()).red().bold(),
        CollisionVerdict::Nearby(_) => style(result.verdict.to_string()).yellow().bold(),
        CollisionVerdict::Clear => style(result.verdict.to_string()).green().bold(),
    };

    println!("Position: {}", result.position);
    println!("Verdict:  {}", verdict);
    println!("Strategy: {}", result.strategy);
    if let Some(distance) = result.hit_distance {
        println!("Hit:      {:.2} m away", distance);
    }
    if let Some(height) = result.hit_object_height {
        println!("Object:   top at {:.2} m", height);
    }
    if let Some(axis) = result.axis {
        println!("Axis:     {}", axis);
    }
    if result.best_effort {
        println!(
            "{}",
            style(format!(
                "Scene did not finish loading ({} tiles pending); result is best effort",
                result.pending_tiles
            ))
            .dim()
        );
    }
}
