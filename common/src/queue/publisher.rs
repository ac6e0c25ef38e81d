// Trigger message publisher implementation for NATS JetStream

use crate::errors::QueueError;
use crate::queue::nats::NatsClient;
use crate::triggers::Trigger;
use async_nats::jetstream::context::PublishAckFuture;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Notification payload published to a trigger's channel when it fires.
///
/// Consumers correlate the fire back to configuration through `trigger_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerMessage {
    /// Unique id of this fire event, also used for broker deduplication
    pub message_id: Uuid,
    /// Id of the trigger that fired
    pub trigger_id: String,
    /// Opaque command carried over from the trigger configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cmd: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, String>,
    /// Instant the scheduler fired the trigger
    pub fired_at: DateTime<Utc>,
}

impl TriggerMessage {
    /// Build the message for a fired trigger. Only registered (valid)
    /// triggers fire, so the id is always present in practice.
    pub fn for_trigger(trigger: &Trigger) -> Self {
        Self {
            message_id: Uuid::new_v4(),
            trigger_id: trigger.id().unwrap_or_default().to_string(),
            cmd: trigger.base().cmd.clone(),
            params: trigger.base().params.clone(),
            fired_at: Utc::now(),
        }
    }
}

/// TriggerPublisher trait for delivering fire notifications to a channel
#[async_trait::async_trait]
pub trait TriggerPublisher: Send + Sync {
    /// Publish a trigger message to the named channel
    async fn publish(&self, channel: &str, message: &TriggerMessage) -> Result<(), QueueError>;

    /// Publish a trigger message with retry logic
    async fn publish_with_retry(
        &self,
        channel: &str,
        message: &TriggerMessage,
        max_retries: u32,
    ) -> Result<(), QueueError>;
}

/// NATS-based trigger publisher implementation
pub struct NatsTriggerPublisher {
    client: NatsClient,
    subject_prefix: String,
    publish_timeout: Duration,
}

impl NatsTriggerPublisher {
    /// Create a new NATS trigger publisher
    pub fn new(client: NatsClient) -> Self {
        // The stream captures "<prefix>.>"; each publish channel becomes a
        // subject under that prefix.
        let subject_prefix = client
            .config()
            .subject
            .trim_end_matches(".>")
            .to_string();
        Self {
            client,
            subject_prefix,
            publish_timeout: Duration::from_secs(5),
        }
    }

    /// Create a new NATS trigger publisher with custom timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.publish_timeout = timeout;
        self
    }

    /// Get the subject for a publish channel
    fn get_subject(&self, channel: &str) -> String {
        format!("{}.{}", self.subject_prefix, channel)
    }
}

#[async_trait::async_trait]
impl TriggerPublisher for NatsTriggerPublisher {
    #[instrument(skip(self, message), fields(
        message_id = %message.message_id,
        trigger_id = %message.trigger_id,
        channel = channel
    ))]
    async fn publish(&self, channel: &str, message: &TriggerMessage) -> Result<(), QueueError> {
        info!("Publishing trigger message");

        let payload = serde_json::to_vec(message).map_err(|e| {
            QueueError::SerializationFailed(format!("Failed to serialize trigger message: {}", e))
        })?;

        let subject = self.get_subject(channel);

        let jetstream = self.client.jetstream();

        // Deduplication headers
        let mut headers = async_nats::HeaderMap::new();
        headers.insert("Nats-Msg-Id", message.message_id.to_string().as_str());
        headers.insert("Trigger-Id", message.trigger_id.as_str());

        let publish_future: PublishAckFuture = jetstream
            .publish_with_headers(subject.clone(), headers, payload.into())
            .await
            .map_err(|e| QueueError::PublishFailed(format!("Failed to publish message: {}", e)))?;

        // Wait for acknowledgment with timeout
        let ack_result = tokio::time::timeout(self.publish_timeout, publish_future).await;

        match ack_result {
            Ok(Ok(_ack)) => {
                info!(
                    subject = %subject,
                    "Trigger message published successfully"
                );
                Ok(())
            }
            Ok(Err(e)) => Err(QueueError::PublishFailed(format!(
                "Failed to get publish acknowledgment: {}",
                e
            ))),
            Err(_) => Err(QueueError::Timeout(format!(
                "Publish acknowledgment timeout after {:?}",
                self.publish_timeout
            ))),
        }
    }

    #[instrument(skip(self, message), fields(
        message_id = %message.message_id,
        trigger_id = %message.trigger_id,
        max_retries = max_retries
    ))]
    async fn publish_with_retry(
        &self,
        channel: &str,
        message: &TriggerMessage,
        max_retries: u32,
    ) -> Result<(), QueueError> {
        let mut attempt = 0;
        let mut last_error = None;

        while attempt <= max_retries {
            match self.publish(channel, message).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    attempt += 1;
                    last_error = Some(e);

                    if attempt <= max_retries {
                        let delay = Duration::from_millis(100 * 2_u64.pow(attempt - 1));
                        warn!(
                            attempt = attempt,
                            delay_ms = delay.as_millis(),
                            "Publish failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            QueueError::PublishFailed("Unknown error during publish with retry".to_string())
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::triggers::IntervalTrigger;

    #[test]
    fn test_message_for_fired_trigger() {
        let trigger = Trigger::Interval(IntervalTrigger::new(
            "t1",
            5,
            "MINUTES",
            "monitor.heartbeat",
            "ping",
            BTreeMap::from([("depth".to_string(), "shallow".to_string())]),
        ));

        let message = TriggerMessage::for_trigger(&trigger);
        assert_eq!(message.trigger_id, "t1");
        assert_eq!(message.cmd.as_deref(), Some("ping"));
        assert_eq!(message.params.get("depth").map(String::as_str), Some("shallow"));
    }

    #[test]
    fn test_message_serialization_round_trip() {
        let message = TriggerMessage {
            message_id: Uuid::new_v4(),
            trigger_id: "t1".to_string(),
            cmd: Some("run".to_string()),
            params: BTreeMap::new(),
            fired_at: Utc::now(),
        };

        let json = serde_json::to_string(&message).unwrap();
        assert!(json.contains("triggerId"));
        assert!(json.contains("firedAt"));
        // Empty params are omitted on the wire.
        assert!(!json.contains("params"));

        let deserialized: TriggerMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(message.message_id, deserialized.message_id);
        assert_eq!(message.trigger_id, deserialized.trigger_id);
        assert_eq!(message.fired_at, deserialized.fired_at);
    }

    #[test]
    fn test_distinct_fires_get_distinct_message_ids() {
        let trigger = Trigger::Interval(IntervalTrigger::new(
            "t1",
            5,
            "MINUTES",
            "ch",
            "run",
            BTreeMap::new(),
        ));
        let a = TriggerMessage::for_trigger(&trigger);
        let b = TriggerMessage::for_trigger(&trigger);
        assert_ne!(a.message_id, b.message_id);
    }
}
