// Range trigger: fires once per day at a point inside a start/end window

use super::TriggerBase;
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use tracing::error;

const WINDOW_FORMAT: &str = "%H:%M";

/// A trigger that fires once per day at a scheduler-chosen point inside the
/// `[startTime, endTime)` window, both expressed as `"HH:MM"` strings.
///
/// Window bounds follow the same policy as the interval trigger's unit:
/// stored raw, parsed on every access, never a constructor error. An
/// unparseable bound resolves to `None` and makes the trigger invalid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeTrigger {
    #[serde(flatten)]
    base: TriggerBase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    end_time: Option<String>,
}

impl RangeTrigger {
    /// Builds the trigger as-is; validity is a separately-queried predicate.
    pub fn new(
        id: impl Into<String>,
        start_time: impl Into<String>,
        end_time: impl Into<String>,
        publish_channel: impl Into<String>,
        cmd: impl Into<String>,
        params: BTreeMap<String, String>,
    ) -> Self {
        Self {
            base: TriggerBase::new(id, publish_channel, cmd, params),
            start_time: Some(start_time.into()),
            end_time: Some(end_time.into()),
        }
    }

    pub fn base(&self) -> &TriggerBase {
        &self.base
    }

    pub fn raw_start_time(&self) -> Option<&str> {
        self.start_time.as_deref()
    }

    pub fn raw_end_time(&self) -> Option<&str> {
        self.end_time.as_deref()
    }

    /// Lower window bound, resolved on demand. `None` (with an error-level
    /// diagnostic) when missing or unparseable.
    pub fn start(&self) -> Option<NaiveTime> {
        parse_window_bound("start", self.start_time.as_deref())
    }

    /// Upper window bound, resolved on demand.
    pub fn end(&self) -> Option<NaiveTime> {
        parse_window_bound("end", self.end_time.as_deref())
    }

    /// True iff both bounds resolve, the window is non-empty, and the base
    /// fields are valid.
    pub fn is_valid(&self) -> bool {
        matches!((self.start(), self.end()), (Some(start), Some(end)) if start < end)
            && self.base.is_valid()
    }
}

fn parse_window_bound(which: &str, raw: Option<&str>) -> Option<NaiveTime> {
    let Some(raw) = raw else {
        error!(bound = which, "Range window bound is not set");
        return None;
    };
    match NaiveTime::parse_from_str(raw, WINDOW_FORMAT) {
        Ok(time) => Some(time),
        Err(_) => {
            error!(bound = which, value = raw, "Unparseable range window bound");
            None
        }
    }
}

// Same resolved-value equality policy as the interval trigger: bounds are
// compared after parsing, and every unparseable bound is the same absent
// value.
impl PartialEq for RangeTrigger {
    fn eq(&self, other: &Self) -> bool {
        self.base == other.base && self.start() == other.start() && self.end() == other.end()
    }
}

impl Eq for RangeTrigger {}

impl Hash for RangeTrigger {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.base.hash(state);
        self.start().hash(state);
        self.end().hash(state);
    }
}

impl fmt::Display for RangeTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RangeTrigger{{startTime={}, endTime={}, {}}}",
            self.start_time.as_deref().unwrap_or("<none>"),
            self.end_time.as_deref().unwrap_or("<none>"),
            self.base
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(trigger: &RangeTrigger) -> u64 {
        let mut hasher = DefaultHasher::new();
        trigger.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_valid_window() {
        let trigger = RangeTrigger::new("t1", "01:30", "03:00", "ch", "run", BTreeMap::new());
        assert!(trigger.is_valid());
        assert_eq!(trigger.start(), NaiveTime::from_hms_opt(1, 30, 0));
        assert_eq!(trigger.end(), NaiveTime::from_hms_opt(3, 0, 0));
    }

    #[test]
    fn test_inverted_window_is_invalid() {
        let trigger = RangeTrigger::new("t1", "03:00", "01:30", "ch", "run", BTreeMap::new());
        assert!(!trigger.is_valid());
    }

    #[test]
    fn test_empty_window_is_invalid() {
        let trigger = RangeTrigger::new("t1", "02:00", "02:00", "ch", "run", BTreeMap::new());
        assert!(!trigger.is_valid());
    }

    #[test]
    fn test_unparseable_bound_resolves_to_none() {
        let trigger = RangeTrigger::new("t1", "1:3O", "03:00", "ch", "run", BTreeMap::new());
        assert_eq!(trigger.start(), None);
        assert!(!trigger.is_valid());
    }

    #[test]
    fn test_missing_bounds_are_invalid() {
        let json = r#"{"id": "t1", "publishChannel": "ch"}"#;
        let trigger: RangeTrigger = serde_json::from_str(json).unwrap();
        assert_eq!(trigger.start(), None);
        assert_eq!(trigger.end(), None);
        assert!(!trigger.is_valid());
    }

    #[test]
    fn test_two_unparseable_starts_compare_equal() {
        let a = RangeTrigger::new("t1", "quarter past", "03:00", "ch", "run", BTreeMap::new());
        let b = RangeTrigger::new("t1", "half past", "03:00", "ch", "run", BTreeMap::new());
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn test_parseable_bound_never_equals_unparseable() {
        let a = RangeTrigger::new("t1", "01:30", "03:00", "ch", "run", BTreeMap::new());
        let b = RangeTrigger::new("t1", "01:3O", "03:00", "ch", "run", BTreeMap::new());
        assert_ne!(a, b);
    }

    #[test]
    fn test_round_trip_preserves_window() {
        let trigger = RangeTrigger::new("t1", "22:00", "23:45", "ch", "run", BTreeMap::new());
        let json = serde_json::to_string(&trigger).unwrap();
        assert!(json.contains("startTime"));
        let back: RangeTrigger = serde_json::from_str(&json).unwrap();
        assert_eq!(trigger, back);
    }
}
