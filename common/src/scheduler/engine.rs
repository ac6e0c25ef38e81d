// Scheduler engine implementation

use crate::queue::{TriggerMessage, TriggerPublisher};
use crate::scheduler::registry::TriggerRegistry;
use crate::telemetry;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{interval, sleep};
use tracing::{debug, error, info, instrument, warn};

/// Configuration for the scheduler
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// How often to poll for due triggers (in seconds)
    pub poll_interval_seconds: u64,
    /// Maximum number of triggers to fire per poll
    pub max_fires_per_poll: usize,
    /// Retries for each publish before the fire is given up for this poll
    pub publish_max_retries: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval_seconds: 1,
            max_fires_per_poll: 100,
            publish_max_retries: 3,
        }
    }
}

/// Scheduler trait for trigger scheduling operations
#[async_trait]
pub trait Scheduler: Send + Sync {
    /// Start the scheduler polling loop
    async fn start(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Stop the scheduler gracefully
    async fn stop(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Fire all triggers that are due, publishing a message per fire
    async fn process_due_triggers(&self)
        -> Result<usize, Box<dyn std::error::Error + Send + Sync>>;
}

/// Main scheduler engine implementation
pub struct SchedulerEngine {
    config: SchedulerConfig,
    registry: Mutex<TriggerRegistry>,
    publisher: Arc<dyn TriggerPublisher>,
    shutdown_tx: tokio::sync::broadcast::Sender<()>,
}

impl SchedulerEngine {
    /// Create a new scheduler engine over an already-populated registry
    pub fn new(
        config: SchedulerConfig,
        registry: TriggerRegistry,
        publisher: Arc<dyn TriggerPublisher>,
    ) -> Self {
        let (shutdown_tx, _shutdown_rx) = tokio::sync::broadcast::channel(1);

        Self {
            config,
            registry: Mutex::new(registry),
            publisher,
            shutdown_tx,
        }
    }

    /// Get a shutdown signal receiver
    pub fn shutdown_receiver(&self) -> tokio::sync::broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// The registry, for inspection
    pub fn registry(&self) -> &Mutex<TriggerRegistry> {
        &self.registry
    }

    /// Fire a single due trigger: publish its message, then advance its
    /// schedule. The registry lock is not held across the publish.
    #[instrument(skip(self), fields(trigger_id = trigger_id))]
    async fn fire_trigger(
        &self,
        trigger_id: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let trigger = {
            let registry = self.registry.lock().await;
            registry.get(trigger_id).map(|entry| entry.trigger.clone())
        };
        let Some(trigger) = trigger else {
            // Unregistered between polls; nothing to fire.
            return Ok(());
        };

        let Some(channel) = trigger.publish_channel().map(str::to_owned) else {
            warn!("Registered trigger has no publish channel, skipping fire");
            return Ok(());
        };

        let message = TriggerMessage::for_trigger(&trigger);

        self.publisher
            .publish_with_retry(&channel, &message, self.config.publish_max_retries)
            .await?;

        telemetry::record_trigger_fired(trigger_id, &channel);
        info!(channel = %channel, "Trigger fired");

        self.registry
            .lock()
            .await
            .record_fire(trigger_id, message.fired_at);

        Ok(())
    }
}

#[async_trait]
impl Scheduler for SchedulerEngine {
    /// Start the scheduler polling loop
    #[instrument(skip(self))]
    async fn start(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        info!(
            poll_interval_seconds = self.config.poll_interval_seconds,
            "Starting scheduler engine"
        );

        let mut poll_interval = interval(Duration::from_secs(self.config.poll_interval_seconds));
        let mut shutdown_rx = self.shutdown_receiver();

        loop {
            tokio::select! {
                _ = poll_interval.tick() => {
                    debug!("Polling for due triggers");

                    match self.process_due_triggers().await {
                        Ok(count) => {
                            if count > 0 {
                                info!(triggers_fired = count, "Fired due triggers");
                            } else {
                                debug!("No triggers due");
                            }
                        }
                        Err(e) => {
                            error!(error = %e, "Error processing due triggers");
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received, stopping scheduler");
                    break;
                }
            }
        }

        info!("Scheduler engine stopped");
        Ok(())
    }

    /// Stop the scheduler gracefully
    #[instrument(skip(self))]
    async fn stop(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        info!("Stopping scheduler engine");

        // Send shutdown signal
        let _ = self.shutdown_tx.send(());

        // Give some time for in-flight fires to complete
        sleep(Duration::from_secs(1)).await;

        info!("Scheduler engine stopped gracefully");
        Ok(())
    }

    /// Fire all triggers that are due
    #[instrument(skip(self))]
    async fn process_due_triggers(
        &self,
    ) -> Result<usize, Box<dyn std::error::Error + Send + Sync>> {
        let now = Utc::now();
        let due = { self.registry.lock().await.due_ids(now) };

        debug!(due_count = due.len(), "Found due triggers");

        let mut fired = 0;

        for trigger_id in due.iter().take(self.config.max_fires_per_poll) {
            match self.fire_trigger(trigger_id).await {
                Ok(()) => {
                    fired += 1;
                }
                Err(e) => {
                    // The trigger stays scheduled; the next poll retries it.
                    error!(
                        trigger_id = %trigger_id,
                        error = %e,
                        "Failed to fire trigger"
                    );
                }
            }
        }

        Ok(fired)
    }
}
