// Trigger registry: admits valid triggers and tracks their fire schedule

use crate::schedule::FireSchedule;
use crate::telemetry;
use crate::triggers::Trigger;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use tracing::{error, info, warn};

/// Why a trigger configuration was rejected at registration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionReason {
    NonPositiveInterval,
    UnrecognizedUnit,
    InvalidRangeWindow,
    InvalidBaseFields,
    DuplicateId,
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionReason::NonPositiveInterval => write!(f, "non-positive interval"),
            RejectionReason::UnrecognizedUnit => write!(f, "unrecognized time unit"),
            RejectionReason::InvalidRangeWindow => write!(f, "invalid range window"),
            RejectionReason::InvalidBaseFields => write!(f, "missing id or publish channel"),
            RejectionReason::DuplicateId => write!(f, "duplicate trigger id"),
        }
    }
}

/// The registration-time reason an invalid trigger is turned away.
///
/// `None` exactly when `trigger.is_valid()` holds; this only refines the
/// boolean into a reportable reason.
pub fn rejection_reason(trigger: &Trigger) -> Option<RejectionReason> {
    match trigger {
        Trigger::Interval(t) => {
            if t.interval() <= 0 {
                Some(RejectionReason::NonPositiveInterval)
            } else if t.unit().is_none() {
                Some(RejectionReason::UnrecognizedUnit)
            } else if !t.base().is_valid() {
                Some(RejectionReason::InvalidBaseFields)
            } else {
                None
            }
        }
        Trigger::Range(t) => {
            let window_ok = matches!(
                (t.start(), t.end()),
                (Some(start), Some(end)) if start < end
            );
            if !window_ok {
                Some(RejectionReason::InvalidRangeWindow)
            } else if !t.base().is_valid() {
                Some(RejectionReason::InvalidBaseFields)
            } else {
                None
            }
        }
    }
}

/// A registered trigger plus its fire bookkeeping.
#[derive(Debug, Clone)]
pub struct RegisteredTrigger {
    pub trigger: Trigger,
    pub next_fire: Option<DateTime<Utc>>,
    pub last_fire: Option<DateTime<Utc>>,
    pub fire_count: u64,
}

/// In-memory set of registered triggers, keyed by trigger id.
#[derive(Debug, Default)]
pub struct TriggerRegistry {
    triggers: HashMap<String, RegisteredTrigger>,
}

impl TriggerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every valid trigger from a deserialized set, logging a
    /// distinct reason for each rejection. Returns the number registered.
    pub fn load(&mut self, triggers: Vec<Trigger>) -> usize {
        let mut registered = 0;
        for trigger in triggers {
            match self.register(trigger) {
                Ok(()) => registered += 1,
                Err((trigger, reason)) => {
                    warn!(
                        trigger_id = trigger.id().unwrap_or("<none>"),
                        kind = trigger.kind(),
                        reason = %reason,
                        "Rejecting invalid trigger configuration"
                    );
                    telemetry::record_trigger_rejected(&reason.to_string());
                }
            }
        }
        registered
    }

    /// Register a single trigger, returning it with the reason on rejection.
    pub fn register(&mut self, trigger: Trigger) -> Result<(), (Trigger, RejectionReason)> {
        if let Some(reason) = rejection_reason(&trigger) {
            return Err((trigger, reason));
        }

        // Valid triggers always carry an id.
        let Some(id) = trigger.id().map(str::to_owned) else {
            return Err((trigger, RejectionReason::InvalidBaseFields));
        };
        if self.triggers.contains_key(&id) {
            return Err((trigger, RejectionReason::DuplicateId));
        }

        let next_fire = trigger.next_fire_time(None).ok().flatten();
        info!(
            trigger_id = %id,
            kind = trigger.kind(),
            channel = trigger.publish_channel().unwrap_or("<none>"),
            "Registered trigger"
        );
        self.triggers.insert(
            id,
            RegisteredTrigger {
                trigger,
                next_fire,
                last_fire: None,
                fire_count: 0,
            },
        );
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&RegisteredTrigger> {
        self.triggers.get(id)
    }

    /// Ids of all triggers due at `now`.
    pub fn due_ids(&self, now: DateTime<Utc>) -> Vec<String> {
        self.triggers
            .iter()
            .filter(|(_, entry)| entry.next_fire.is_some_and(|next| next <= now))
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Record a fire and advance the trigger's schedule.
    pub fn record_fire(&mut self, id: &str, fired_at: DateTime<Utc>) {
        let Some(entry) = self.triggers.get_mut(id) else {
            return;
        };
        entry.last_fire = Some(fired_at);
        entry.fire_count += 1;
        entry.next_fire = match entry.trigger.next_fire_time(Some(fired_at)) {
            Ok(next) => next,
            Err(e) => {
                // Leaves the trigger dormant rather than firing it forever.
                error!(trigger_id = id, error = %e, "Failed to advance fire schedule");
                None
            }
        };
    }
}
