// Queue module for NATS JetStream integration

pub mod nats;
pub mod publisher;

pub use nats::{NatsClient, NatsConfig};
pub use publisher::{NatsTriggerPublisher, TriggerMessage, TriggerPublisher};
