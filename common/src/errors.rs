// Error handling framework
//
// Trigger invalidity (a non-positive interval, an unresolvable unit or
// window bound, missing base fields) is deliberately not an error type:
// those are ordinary, inspectable states queried through `is_valid`, so
// partially-invalid configuration can be deserialized and rejected at
// registration time instead of failing parsing.

use thiserror::Error;

/// Fire-schedule calculation errors
#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("Invalid trigger configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Fire time calculation failed: {0}")]
    CalculationFailed(String),
}

/// Queue-related errors
#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Failed to connect to queue: {0}")]
    Connection(String),

    #[error("Failed to create stream: {0}")]
    StreamCreation(String),

    #[error("Failed to publish message: {0}")]
    PublishFailed(String),

    #[error("Message serialization failed: {0}")]
    SerializationFailed(String),

    #[error("Health check failed: {0}")]
    HealthCheck(String),

    #[error("Queue operation timeout: {0}")]
    Timeout(String),
}

/// Trigger-set file loading errors
///
/// Only unreadable or syntactically-broken files are errors here; records
/// that parse into invalid triggers load fine and are filtered downstream.
#[derive(Error, Debug)]
pub enum TriggerLoadError {
    #[error("Failed to read trigger file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse trigger file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
