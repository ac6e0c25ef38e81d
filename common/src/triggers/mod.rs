// Trigger data model: the closed set of trigger variants and their shared fields

mod interval;
mod range;

pub use interval::{IntervalTrigger, TimeUnit};
pub use range::RangeTrigger;

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Accept JSON `null` for a non-optional field by falling back to the
/// field's default, so partially-invalid records still deserialize.
pub(crate) fn null_to_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Fields shared by every trigger variant.
///
/// All fields are accepted as missing or null on input; `is_valid` is the
/// only gate on whether the carrying trigger is usable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerBase {
    /// Unique identifier within a scheduler's trigger set. Published trigger
    /// messages carry it so consumers can correlate fires back to
    /// configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Channel fire notifications are published on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_channel: Option<String>,
    /// Opaque command describing what the fire represents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cmd: Option<String>,
    /// Opaque command parameters.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, String>,
}

impl TriggerBase {
    pub fn new(
        id: impl Into<String>,
        publish_channel: impl Into<String>,
        cmd: impl Into<String>,
        params: BTreeMap<String, String>,
    ) -> Self {
        Self {
            id: Some(id.into()),
            publish_channel: Some(publish_channel.into()),
            cmd: Some(cmd.into()),
            params,
        }
    }

    /// A trigger is usable only when it carries a non-empty id and a
    /// non-empty publish channel.
    pub fn is_valid(&self) -> bool {
        non_empty(&self.id) && non_empty(&self.publish_channel)
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn publish_channel(&self) -> Option<&str> {
        self.publish_channel.as_deref()
    }
}

impl fmt::Display for TriggerBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "id={}, publishChannel={}",
            self.id.as_deref().unwrap_or("<none>"),
            self.publish_channel.as_deref().unwrap_or("<none>")
        )
    }
}

fn non_empty(field: &Option<String>) -> bool {
    field.as_deref().is_some_and(|value| !value.is_empty())
}

/// The closed set of trigger variants, discriminated by a `kind` tag on the
/// wire.
///
/// Two triggers of different kinds are never equal, regardless of their
/// field values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Trigger {
    Interval(IntervalTrigger),
    Range(RangeTrigger),
}

impl Trigger {
    pub fn base(&self) -> &TriggerBase {
        match self {
            Trigger::Interval(trigger) => trigger.base(),
            Trigger::Range(trigger) => trigger.base(),
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.base().id()
    }

    pub fn publish_channel(&self) -> Option<&str> {
        self.base().publish_channel()
    }

    /// Whether a scheduler may register this trigger. Invalid triggers are
    /// ordinary values; nothing here errors.
    pub fn is_valid(&self) -> bool {
        match self {
            Trigger::Interval(trigger) => trigger.is_valid(),
            Trigger::Range(trigger) => trigger.is_valid(),
        }
    }

    /// Kind name matching the wire tag, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Trigger::Interval(_) => "interval",
            Trigger::Range(_) => "range",
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Interval(trigger) => trigger.fmt(f),
            Trigger::Range(trigger) => trigger.fmt(f),
        }
    }
}
