// Interval trigger: repeats at a fixed period expressed as (count, unit)

use super::{null_to_default, TriggerBase};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use tracing::error;

/// The closed set of time units an interval trigger may repeat in.
///
/// Parsing is a case-sensitive exact match against the uppercase names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
}

impl FromStr for TimeUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MILLISECONDS" => Ok(TimeUnit::Milliseconds),
            "SECONDS" => Ok(TimeUnit::Seconds),
            "MINUTES" => Ok(TimeUnit::Minutes),
            "HOURS" => Ok(TimeUnit::Hours),
            _ => Err(format!("Invalid time unit: {}", s)),
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeUnit::Milliseconds => write!(f, "MILLISECONDS"),
            TimeUnit::Seconds => write!(f, "SECONDS"),
            TimeUnit::Minutes => write!(f, "MINUTES"),
            TimeUnit::Hours => write!(f, "HOURS"),
        }
    }
}

impl TimeUnit {
    /// Convert a repeat count in this unit to a concrete duration. `None`
    /// when the count is out of range for the unit.
    pub fn duration(&self, count: i64) -> Option<Duration> {
        match self {
            TimeUnit::Milliseconds => Duration::try_milliseconds(count),
            TimeUnit::Seconds => Duration::try_seconds(count),
            TimeUnit::Minutes => Duration::try_minutes(count),
            TimeUnit::Hours => Duration::try_hours(count),
        }
    }
}

/// A trigger that starts firing at registration time and repeats every
/// `interval` units of `unit`. Each fire publishes a trigger message to the
/// publish channel carried by the base fields.
///
/// The unit is stored as its raw string and resolved on every access, so a
/// record with an unrecognized unit still deserializes; construction never
/// validates and `is_valid` is the only gate a scheduler should use.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntervalTrigger {
    #[serde(flatten)]
    base: TriggerBase,
    #[serde(default, deserialize_with = "null_to_default")]
    interval: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    unit: Option<String>,
}

impl IntervalTrigger {
    /// Builds the trigger as-is. Invalid values are stored without
    /// complaint; validity is a separately-queried predicate.
    pub fn new(
        id: impl Into<String>,
        interval: i64,
        unit: impl Into<String>,
        publish_channel: impl Into<String>,
        cmd: impl Into<String>,
        params: BTreeMap<String, String>,
    ) -> Self {
        Self {
            base: TriggerBase::new(id, publish_channel, cmd, params),
            interval,
            unit: Some(unit.into()),
        }
    }

    pub fn base(&self) -> &TriggerBase {
        &self.base
    }

    /// Repeat count, in units of whatever `unit` resolves to.
    pub fn interval(&self) -> i64 {
        self.interval
    }

    /// The stored unit string, unparsed.
    pub fn raw_unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    /// Resolve the stored unit string against the closed set of recognized
    /// time units. A missing or unrecognized value is reported through an
    /// error-level diagnostic and returned as `None`; callers must treat
    /// "no unit" as a normal, checkable outcome.
    pub fn unit(&self) -> Option<TimeUnit> {
        let Some(raw) = self.unit.as_deref() else {
            error!("Time unit is not set");
            return None;
        };
        match raw.parse::<TimeUnit>() {
            Ok(unit) => Some(unit),
            Err(_) => {
                error!(unit = raw, "Unrecognized time unit");
                None
            }
        }
    }

    /// True iff the repeat count is positive, the unit resolves, and the
    /// base fields are valid.
    pub fn is_valid(&self) -> bool {
        self.interval > 0 && self.unit().is_some() && self.base.is_valid()
    }
}

// Equality and hashing compare the *resolved* unit, not the raw string: two
// different strings that both fail to parse compare as the same absent unit,
// and a string that parses is never equal to one that does not.
impl PartialEq for IntervalTrigger {
    fn eq(&self, other: &Self) -> bool {
        self.base == other.base
            && self.interval == other.interval
            && self.unit() == other.unit()
    }
}

impl Eq for IntervalTrigger {}

impl Hash for IntervalTrigger {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.base.hash(state);
        self.interval.hash(state);
        self.unit().hash(state);
    }
}

impl fmt::Display for IntervalTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "IntervalTrigger{{interval={}, unit={}, {}}}",
            self.interval,
            self.unit.as_deref().unwrap_or("<none>"),
            self.base
        )
    }
}
