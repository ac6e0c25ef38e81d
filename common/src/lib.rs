// Common library shared by the scheduler binary and integration tests

pub mod config;
pub mod errors;
pub mod queue;
pub mod schedule;
pub mod scheduler;
pub mod telemetry;
pub mod triggers;
