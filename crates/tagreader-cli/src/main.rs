mod cli;
mod scenario;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tagreader_hardware::mock::{MockBusFactory, MockReader};
use tagreader_recovery::{ReaderConfig, ReaderEvent, ReaderLoop, RecoveryController};
use tracing::info;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, Scenario};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ReaderConfig::default().poll_timeout(Duration::from_millis(cli.poll_timeout_ms));

    match cli.command {
        Commands::Read {
            scenario,
            calls,
            stats,
        } => read(scenario, config, calls, stats).await?,
        Commands::Watch { scenario, events } => watch(scenario, config, events).await?,
    }

    Ok(())
}

fn build_controller(
    scenario: Scenario,
    config: ReaderConfig,
) -> Result<RecoveryController<MockBusFactory, MockReader>> {
    let (buses, _) = MockBusFactory::new();
    let (reader, script) = MockReader::new();
    scenario::install(scenario, &script).context("Failed to script mock reader")?;

    RecoveryController::with_factories(buses, reader, config).context("Invalid reader configuration")
}

async fn read(scenario: Scenario, config: ReaderConfig, calls: usize, stats: bool) -> Result<()> {
    let controller = build_controller(scenario, config)?;
    info!(?scenario, calls, "Running read calls");

    for _ in 0..calls {
        let result = controller.read_default().await;
        println!("{}", serde_json::to_string_pretty(&result)?);

        if !result.is_success() {
            eprintln!("{}", result.advice().message());
        }
    }

    if stats {
        println!("{}", serde_json::to_string_pretty(&controller.stats())?);
    }

    Ok(())
}

async fn watch(scenario: Scenario, config: ReaderConfig, events: usize) -> Result<()> {
    let controller = Arc::new(build_controller(scenario, config)?);
    let mut handle = ReaderLoop::new(controller).start();
    info!(?scenario, events, "Watching reader");

    for _ in 0..events {
        let Some(event) = handle.recv().await else {
            break;
        };

        let label = match &event {
            ReaderEvent::CardRead(_) => "card_read",
            ReaderEvent::ReadFailed(_) => "read_failed",
            ReaderEvent::ResetRecommended(_) => "reset_recommended",
            _ => "event",
        };
        println!("{label} {}", serde_json::to_string(event.result())?);
    }

    handle.shutdown().await;
    Ok(())
}
