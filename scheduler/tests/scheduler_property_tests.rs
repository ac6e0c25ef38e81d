// Property-based tests for scheduler components

use common::errors::QueueError;
use common::queue::{TriggerMessage, TriggerPublisher};
use common::scheduler::{
    rejection_reason, Scheduler, SchedulerConfig, SchedulerEngine, TriggerRegistry,
};
use common::triggers::{IntervalTrigger, Trigger};
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Mock trigger publisher that records every published message
struct MockTriggerPublisher {
    published: Arc<tokio::sync::Mutex<Vec<(String, TriggerMessage)>>>,
}

impl MockTriggerPublisher {
    fn new() -> Self {
        Self {
            published: Arc::new(tokio::sync::Mutex::new(Vec::new())),
        }
    }

    fn log(&self) -> Arc<tokio::sync::Mutex<Vec<(String, TriggerMessage)>>> {
        self.published.clone()
    }
}

#[async_trait::async_trait]
impl TriggerPublisher for MockTriggerPublisher {
    async fn publish(&self, channel: &str, message: &TriggerMessage) -> Result<(), QueueError> {
        self.published
            .lock()
            .await
            .push((channel.to_string(), message.clone()));
        Ok(())
    }

    async fn publish_with_retry(
        &self,
        channel: &str,
        message: &TriggerMessage,
        _max_retries: u32,
    ) -> Result<(), QueueError> {
        self.publish(channel, message).await
    }
}

fn any_unit() -> impl Strategy<Value = String> {
    prop_oneof![
        prop::sample::select(&["MILLISECONDS", "SECONDS", "MINUTES", "HOURS"][..])
            .prop_map(str::to_string),
        "[a-z]{1,10}",
    ]
}

/// *For any* trigger configuration, the registry admits it iff `is_valid`
/// holds; the rejection reason is only a refinement of that boolean.
#[test]
fn property_registry_admits_exactly_the_valid_triggers() {
    proptest!(|(
        interval in -10i64..10,
        unit in any_unit(),
        id in "[a-z]{0,6}",
        channel in "[a-z]{0,6}"
    )| {
        let trigger = Trigger::Interval(IntervalTrigger::new(
            id,
            interval,
            unit,
            channel,
            "run",
            BTreeMap::new(),
        ));
        let valid = trigger.is_valid();
        prop_assert_eq!(rejection_reason(&trigger).is_none(), valid);

        let mut registry = TriggerRegistry::new();
        prop_assert_eq!(registry.register(trigger).is_ok(), valid);
        prop_assert_eq!(registry.len(), usize::from(valid));
    });
}

/// *For any* scheduler configuration, the poll loop parameters stay within
/// the configured bounds.
#[test]
fn property_scheduler_config_round_trips() {
    proptest!(|(
        poll_interval_seconds in 1u64..3600,
        max_fires_per_poll in 1usize..1000,
        publish_max_retries in 0u32..10
    )| {
        let config = SchedulerConfig {
            poll_interval_seconds,
            max_fires_per_poll,
            publish_max_retries,
        };
        prop_assert!(config.poll_interval_seconds > 0);
        prop_assert!(config.max_fires_per_poll > 0);
        prop_assert_eq!(config.publish_max_retries, publish_max_retries);
    });
}

/// A freshly-registered interval trigger is due immediately and fires once
/// per poll at most.
#[tokio::test]
async fn test_engine_fires_due_trigger_once_per_period() {
    let mut registry = TriggerRegistry::new();
    registry
        .register(Trigger::Interval(IntervalTrigger::new(
            "heartbeat",
            1,
            "HOURS",
            "monitor.heartbeat",
            "ping",
            BTreeMap::new(),
        )))
        .unwrap();

    let publisher = MockTriggerPublisher::new();
    let log = publisher.log();
    let engine = SchedulerEngine::new(
        SchedulerConfig::default(),
        registry,
        Arc::new(publisher),
    );

    // First poll fires the registration-time schedule.
    let fired = engine.process_due_triggers().await.unwrap();
    assert_eq!(fired, 1);

    // The period has not elapsed; a second poll fires nothing.
    let fired = engine.process_due_triggers().await.unwrap();
    assert_eq!(fired, 0);

    let published = log.lock().await;
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].0, "monitor.heartbeat");
    assert_eq!(published[0].1.trigger_id, "heartbeat");
}
