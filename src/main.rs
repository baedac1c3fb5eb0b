//! CLI entry point for the InterfaceKit gateway.
//!
//! # Usage
//!
//! Serve requests from stdin against the simulated board:
//! ```bash
//! ifkit-gateway serve
//! ifkit-gateway --config lab.toml serve
//! ```
//!
//! Print the effective configuration:
//! ```bash
//! IFKIT_DEVICE__SERIAL=4242 ifkit-gateway check-config
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ifkit_core::InterfaceKitConnector;
use ifkit_driver_mock::{MockConnector, MockInterfaceKit};
use ifkit_gateway::command::{help_text, CommandDispatcher};
use ifkit_gateway::config::{GatewayConfig, DEFAULT_CONFIG_PATH};
use ifkit_gateway::console::Console;
use ifkit_gateway::events::run_event_pump;
use ifkit_gateway::{logging, Gateway, ShutdownSignal};
use tokio::io::BufReader;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "ifkit-gateway")]
#[command(about = "Attachment-guarded InterfaceKit I/O gateway", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve console requests against the simulated InterfaceKit
    Serve,

    /// Load and validate configuration, then print it as JSON
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = GatewayConfig::load_from(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    config.validate()?;

    match cli.command {
        Commands::Serve => serve(config).await,
        Commands::CheckConfig => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

async fn serve(config: GatewayConfig) -> Result<()> {
    logging::init_from_config(&config).map_err(anyhow::Error::msg)?;
    info!(
        name = %config.application.name,
        namespace = %config.device.namespace,
        "Starting gateway"
    );

    let kit = Arc::new(MockInterfaceKit::with_faults(
        config.simulation.clone(),
        config.faults.to_fault_config(),
    ));
    let opened = MockConnector::new(kit.clone())
        .open(config.serial_filter())
        .context("opening InterfaceKit")?;

    let shutdown = ShutdownSignal::new();
    let gateway = Arc::new(Gateway::new(
        opened.handle,
        config.gateway_settings(),
        shutdown.clone(),
    ));
    let pump = tokio::spawn(run_event_pump(
        gateway.clone(),
        opened.events,
        shutdown.clone(),
    ));

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                shutdown.trigger("ctrl-c");
            }
        });
    }

    let dispatcher = CommandDispatcher::new(config.device.namespace.clone(), shutdown.clone());
    gateway.mark_initialized();
    for line in help_text(gateway.namespace()) {
        info!("{}", line);
    }

    let attach_delay = Duration::from_millis(config.simulation.attach_delay_ms);
    tokio::spawn(async move {
        tokio::time::sleep(attach_delay).await;
        kit.plug();
    });

    let console = Console::new(gateway.clone(), dispatcher);
    console
        .run(
            BufReader::new(tokio::io::stdin()),
            tokio::io::stdout(),
            shutdown.clone(),
        )
        .await
        .context("console I/O")?;

    shutdown.trigger("console closed");
    if let Err(e) = pump.await {
        warn!(error = %e, "Event pump task failed");
    }
    info!(namespace = gateway.namespace(), "Gateway stopped");
    Ok(())
}
