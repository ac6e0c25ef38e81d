// Scheduler module: trigger registry and polling engine

pub mod engine;
pub mod registry;

pub use engine::{Scheduler, SchedulerConfig, SchedulerEngine};
pub use registry::{rejection_reason, RegisteredTrigger, RejectionReason, TriggerRegistry};
