//! Serve command - expose the engine over HTTP until Ctrl+C.

use std::net::SocketAddr;
use std::time::Duration;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use skyprobe::http;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use super::common::{resolve_engine_config, ModelArg, StrategyArg};
use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the serve command.
#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Address to listen on (overrides server.bind, default 127.0.0.1:3000)
    #[arg(long)]
    pub bind: Option<SocketAddr>,

    /// Scene descriptor path or URL (overrides scene.source)
    #[arg(long)]
    pub scene: Option<String>,

    /// Ray casting strategy (overrides raycast.strategy)
    #[arg(long, value_enum)]
    pub strategy: Option<StrategyArg>,

    /// Scene sharing model (overrides engine.model)
    #[arg(long, value_enum)]
    pub model: Option<ModelArg>,
}

/// Run the serve command.
pub fn run(args: ServeArgs) -> Result<(), CliError> {
    let runner = CliRunner::new()?;
    runner.log_startup("serve");
    let config = runner.config();

    let bind = args.bind.unwrap_or(config.server.bind);
    let engine_config = resolve_engine_config(args.strategy, args.model, config)?;
    let source = runner.scene_source(args.scene)?;

    // Print banner
    println!("SkyProbe v{}", skyprobe::VERSION);
    println!("================================");
    println!();
    println!("Scene:      {}", source.describe());
    println!("Strategy:   {}", engine_config.strategy);
    println!(
        "Thresholds: inside < {} m, nearby < {} m",
        engine_config.thresholds.inside(),
        engine_config.thresholds.nearby()
    );
    println!("Model:      {}", engine_config.model);
    println!();

    let engine = runner.create_engine(engine_config, source);

    // Set up signal handler for graceful shutdown
    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    ctrlc::set_handler(move || {
        println!();
        println!("Received shutdown signal, stopping...");
        signal.cancel();
    })
    .map_err(|e| CliError::Config(format!("Failed to set signal handler: {}", e)))?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message("Loading scene...");
    spinner.enable_steady_tick(Duration::from_millis(100));

    let served = runner.runtime().block_on(async {
        let handle = tokio::select! {
            handle = engine.initialize_scene() => handle?,
            _ = shutdown.cancelled() => {
                spinner.finish_and_clear();
                return Ok(());
            }
        };

        match handle.readiness() {
            Some(state) if state.is_best_effort() => spinner.finish_with_message(format!(
                "{} scene not fully loaded, answers are best effort",
                style("!").yellow().bold()
            )),
            Some(_) => spinner.finish_with_message(format!(
                "{} scene ready",
                style("✓").green().bold()
            )),
            None => spinner.finish_with_message(format!(
                "{} scenes load per query",
                style("✓").green().bold()
            )),
        }

        let listener = TcpListener::bind(bind).await?;
        println!();
        println!("Listening on http://{}", bind);
        println!("  POST {}", http::CHECK_COLLISION_PATH);
        println!("  GET  {}", http::HEALTH_PATH);
        println!();
        println!("Press Ctrl+C to stop");
        println!();

        let router = http::router(engine.clone(), handle);
        http::serve(listener, router, shutdown.clone()).await?;
        Ok::<(), CliError>(())
    });

    engine.shutdown();

    let stats = engine.stats();
    println!();
    println!("Session Summary");
    println!("───────────────");
    println!("  Queries answered: {}", stats.queries_executed);
    println!("  Best effort:      {}", stats.best_effort_results);
    println!("  Rejected:         {}", stats.queries_rejected);
    println!("  Scenes opened:    {}", stats.scenes_opened);

    served
}
