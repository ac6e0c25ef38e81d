// Fire-time calculation for registered triggers
//
// Valid triggers always produce a next fire time; the error paths below are
// only reachable when a caller asks for the schedule of a trigger that was
// never gated through `is_valid`.

use crate::errors::ScheduleError;
use crate::triggers::{IntervalTrigger, RangeTrigger, Trigger};
use chrono::{DateTime, Days, Duration, Utc};
use rand::Rng;

/// Computes when a trigger should fire next.
pub trait FireSchedule {
    /// The next instant this trigger should fire, given when it last fired
    /// (`None` before the first fire).
    fn next_fire_time(
        &self,
        last_fire: Option<DateTime<Utc>>,
    ) -> Result<Option<DateTime<Utc>>, ScheduleError>;
}

impl FireSchedule for Trigger {
    fn next_fire_time(
        &self,
        last_fire: Option<DateTime<Utc>>,
    ) -> Result<Option<DateTime<Utc>>, ScheduleError> {
        match self {
            Trigger::Interval(trigger) => trigger.next_fire_time(last_fire),
            Trigger::Range(trigger) => trigger.next_fire_time(last_fire),
        }
    }
}

impl FireSchedule for IntervalTrigger {
    /// First fire is at registration time; each subsequent fire is exactly
    /// `interval x unit` after the previous one.
    fn next_fire_time(
        &self,
        last_fire: Option<DateTime<Utc>>,
    ) -> Result<Option<DateTime<Utc>>, ScheduleError> {
        if self.interval() <= 0 {
            return Err(ScheduleError::InvalidConfiguration(format!(
                "interval must be positive, got {}",
                self.interval()
            )));
        }
        let unit = self.unit().ok_or_else(|| {
            ScheduleError::InvalidConfiguration("time unit does not resolve".to_string())
        })?;

        match last_fire {
            None => Ok(Some(Utc::now())),
            Some(last) => {
                let step = unit.duration(self.interval()).ok_or_else(|| {
                    ScheduleError::CalculationFailed(format!(
                        "interval {} {} is out of range",
                        self.interval(),
                        unit
                    ))
                })?;
                let next = last.checked_add_signed(step).ok_or_else(|| {
                    ScheduleError::CalculationFailed("fire time overflows".to_string())
                })?;
                Ok(Some(next))
            }
        }
    }
}

impl FireSchedule for RangeTrigger {
    /// Next fire is a uniformly random instant inside the next occurrence
    /// of the window: today if today's window is still open and has not
    /// fired yet, tomorrow otherwise.
    fn next_fire_time(
        &self,
        last_fire: Option<DateTime<Utc>>,
    ) -> Result<Option<DateTime<Utc>>, ScheduleError> {
        let (Some(start), Some(end)) = (self.start(), self.end()) else {
            return Err(ScheduleError::InvalidConfiguration(
                "range window bounds do not resolve".to_string(),
            ));
        };
        if start >= end {
            return Err(ScheduleError::InvalidConfiguration(format!(
                "range window is empty: {} >= {}",
                start, end
            )));
        }

        let now = Utc::now();
        let today = now.date_naive();
        let fired_today = last_fire.is_some_and(|last| last.date_naive() == today);
        let window_closed = now.time() >= end;

        let day = if fired_today || window_closed {
            today
                .checked_add_days(Days::new(1))
                .ok_or_else(|| ScheduleError::CalculationFailed("fire date overflows".to_string()))?
        } else {
            today
        };

        let window_seconds = (end - start).num_seconds();
        let offset = rand::thread_rng().gen_range(0..window_seconds);
        let fire_at = day.and_time(start).and_utc() + Duration::seconds(offset);
        Ok(Some(fire_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn interval_trigger(interval: i64, unit: &str) -> IntervalTrigger {
        IntervalTrigger::new("t1", interval, unit, "ch", "run", BTreeMap::new())
    }

    #[test]
    fn test_interval_first_fire_is_registration_time() {
        let trigger = interval_trigger(5, "MINUTES");
        let next = trigger.next_fire_time(None).unwrap().unwrap();
        assert!((next - Utc::now()).num_seconds().abs() < 1);
    }

    #[test]
    fn test_interval_subsequent_fire_is_one_period_later() {
        let trigger = interval_trigger(5, "MINUTES");
        let last = Utc::now();
        let next = trigger.next_fire_time(Some(last)).unwrap().unwrap();
        assert_eq!(next, last + Duration::minutes(5));
    }

    #[test]
    fn test_interval_milliseconds_period() {
        let trigger = interval_trigger(250, "MILLISECONDS");
        let last = Utc::now();
        let next = trigger.next_fire_time(Some(last)).unwrap().unwrap();
        assert_eq!(next, last + Duration::milliseconds(250));
    }

    #[test]
    fn test_unresolvable_unit_is_a_schedule_error() {
        let trigger = interval_trigger(5, "FORTNIGHT");
        assert!(trigger.next_fire_time(None).is_err());
    }

    #[test]
    fn test_non_positive_interval_is_a_schedule_error() {
        let trigger = interval_trigger(0, "SECONDS");
        assert!(trigger.next_fire_time(None).is_err());
    }

    #[test]
    fn test_range_fire_lands_inside_the_window() {
        let trigger = RangeTrigger::new("t1", "01:30", "03:00", "ch", "run", BTreeMap::new());
        let start = trigger.start().unwrap();
        let end = trigger.end().unwrap();
        for _ in 0..50 {
            let fire_at = trigger.next_fire_time(None).unwrap().unwrap();
            assert!(fire_at.time() >= start);
            assert!(fire_at.time() < end);
        }
    }

    #[test]
    fn test_range_fire_moves_to_next_day_after_firing() {
        let trigger = RangeTrigger::new("t1", "00:00", "23:59", "ch", "run", BTreeMap::new());
        let fired = Utc::now();
        let next = trigger.next_fire_time(Some(fired)).unwrap().unwrap();
        assert_eq!(next.date_naive(), fired.date_naive() + Days::new(1));
    }

    #[test]
    fn test_range_with_unresolvable_bound_is_a_schedule_error() {
        let trigger = RangeTrigger::new("t1", "soon", "03:00", "ch", "run", BTreeMap::new());
        assert!(trigger.next_fire_time(None).is_err());
    }

    #[test]
    fn test_trigger_dispatches_to_variant_schedule() {
        let trigger = Trigger::Interval(interval_trigger(1, "SECONDS"));
        let last = Utc::now();
        let next = trigger.next_fire_time(Some(last)).unwrap().unwrap();
        assert_eq!(next, last + Duration::seconds(1));
    }
}
