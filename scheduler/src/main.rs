// Scheduler binary entry point

use common::config::{load_triggers, Settings};
use common::queue::{NatsClient, NatsConfig, NatsTriggerPublisher, TriggerPublisher};
use common::scheduler::{Scheduler, SchedulerConfig, SchedulerEngine, TriggerRegistry};
use common::telemetry;
use std::sync::Arc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    telemetry::init_logging("scheduler=info,common=info")?;

    info!("Starting trigger scheduler");

    // Load configuration
    let settings = Settings::load().map_err(|e| {
        error!(error = %e, "Failed to load configuration");
        e
    })?;
    settings.validate().map_err(|e| {
        error!(error = %e, "Invalid configuration");
        e
    })?;

    telemetry::init_metrics(settings.observability.metrics_port)?;

    info!(
        nats_url = %settings.nats.url,
        triggers_file = %settings.scheduler.triggers_file,
        "Configuration loaded"
    );

    // Load the serialized trigger set and register the valid entries;
    // invalid ones are turned away with a per-reason warning.
    let triggers = load_triggers(&settings.scheduler.triggers_file).map_err(|e| {
        error!(error = %e, "Failed to load trigger set");
        e
    })?;
    info!(trigger_count = triggers.len(), "Trigger set loaded");

    let mut registry = TriggerRegistry::new();
    let registered = registry.load(triggers);
    if registry.is_empty() {
        warn!("No valid triggers registered, scheduler will idle");
    } else {
        info!(registered = registered, "Triggers registered");
    }

    // Initialize NATS client and stream
    info!("Initializing NATS client");
    let nats_config = NatsConfig {
        url: settings.nats.url.clone(),
        stream_name: settings.nats.stream_name.clone(),
        ..NatsConfig::default()
    };
    let nats_client = NatsClient::new(nats_config).await.map_err(|e| {
        error!(error = %e, "Failed to initialize NATS client");
        e
    })?;
    nats_client.initialize_stream().await.map_err(|e| {
        error!(error = %e, "Failed to initialize NATS stream");
        e
    })?;
    info!("NATS stream initialized");

    // Create trigger publisher
    let publisher =
        Arc::new(NatsTriggerPublisher::new(nats_client)) as Arc<dyn TriggerPublisher>;
    info!("Trigger publisher initialized");

    // Create scheduler engine
    let scheduler_config = SchedulerConfig {
        poll_interval_seconds: settings.scheduler.poll_interval_seconds,
        max_fires_per_poll: settings.scheduler.max_fires_per_poll,
        publish_max_retries: settings.scheduler.publish_max_retries,
    };
    let engine = Arc::new(SchedulerEngine::new(scheduler_config, registry, publisher));
    info!("Scheduler engine created");

    // Set up graceful shutdown on Ctrl+C
    let engine_for_shutdown = engine.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            return;
        }
        info!("Received Ctrl+C signal, initiating graceful shutdown");
        if let Err(e) = engine_for_shutdown.stop().await {
            error!(error = %e, "Error during scheduler shutdown");
        }
    });

    // Start the scheduler
    info!("Starting scheduler polling loop");
    if let Err(e) = engine.start().await {
        error!(error = %e, "Scheduler error");
        return Err(e);
    }

    info!("Scheduler stopped");
    Ok(())
}
