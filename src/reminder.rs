use std::fmt;

use chrono::{NaiveTime, Timelike};

use crate::preferences::{PreferenceKey, PreferenceStore};

pub const DEFAULT_HOUR: u32 = 20;
pub const DEFAULT_MINUTE: u32 = 0;

/// Wall-clock time of day the reminder fires at, with minute precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ReminderFireTime(NaiveTime);

impl ReminderFireTime {
    /// Returns `None` unless `hour` is in `0..24` and `minute` in `0..60`.
    pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(Self)
    }

    pub fn time(&self) -> &NaiveTime {
        &self.0
    }

    pub fn hour(&self) -> u32 {
        self.0.hour()
    }

    pub fn minute(&self) -> u32 {
        self.0.minute()
    }
}

impl Default for ReminderFireTime {
    fn default() -> Self {
        Self::from_hm(DEFAULT_HOUR, DEFAULT_MINUTE).expect("Default time is in range.")
    }
}

impl fmt::Display for ReminderFireTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderConfig {
    pub enabled: bool,
    pub fire_at: ReminderFireTime,
}

impl ReminderConfig {
    /// Reads the enabled flag and the time of day together.
    ///
    /// A stored hour/minute pair that does not form a valid time (hand-edited or
    /// corrupted storage) is replaced by `defaults` as a whole; the two fields
    /// are never mixed from different sources.
    pub fn load(store: &dyn PreferenceStore, defaults: ReminderFireTime) -> Self {
        let enabled = store.get_bool(PreferenceKey::Enabled, false);
        let hour = store.get_int(PreferenceKey::Hour, defaults.hour() as i64);
        let minute = store.get_int(PreferenceKey::Minute, defaults.minute() as i64);

        let fire_at = u32::try_from(hour)
            .ok()
            .zip(u32::try_from(minute).ok())
            .and_then(|(hour, minute)| ReminderFireTime::from_hm(hour, minute))
            .unwrap_or_else(|| {
                log::warn!(
                    "Stored reminder time is out of range, using defaults. [hour = {}, minute = {}, default = {}]",
                    hour,
                    minute,
                    defaults
                );
                defaults
            });

        Self { enabled, fire_at }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AlarmKind {
    /// Posts the user-visible notification.
    Reminder,
    /// Re-arms both alarms for the following day.
    SelfReschedule,
}

impl AlarmKind {
    pub const ALL: [AlarmKind; 2] = [AlarmKind::Reminder, AlarmKind::SelfReschedule];

    /// Fixed registration identity; registering the same kind again replaces
    /// the previous registration.
    pub fn request_code(&self) -> i32 {
        match self {
            AlarmKind::Reminder => 1001,
            AlarmKind::SelfReschedule => 1002,
        }
    }
}

impl fmt::Display for AlarmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlarmKind::Reminder => f.write_str("reminder"),
            AlarmKind::SelfReschedule => f.write_str("self-reschedule"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmPrecision {
    /// Wake-capable delivery at the requested instant.
    Exact,
    /// Best-effort delivery, possibly deferred by the platform.
    Inexact,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingAlarm {
    pub kind: AlarmKind,
    pub trigger_epoch_millis: i64,
    pub precision: AlarmPrecision,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preferences::{InMemoryPreferenceStore, PreferenceUpdate};

    #[test]
    fn fire_time_is_whole_minutes() {
        let time = ReminderFireTime::from_hm(9, 30).unwrap();

        assert_eq!(time.time().second(), 0);
        assert_eq!(time.time().nanosecond(), 0);
        assert_eq!(time.to_string(), "09:30");
    }

    #[test]
    fn from_hm_rejects_out_of_range_values() {
        assert!(ReminderFireTime::from_hm(24, 0).is_none());
        assert!(ReminderFireTime::from_hm(0, 60).is_none());
        assert!(ReminderFireTime::from_hm(23, 59).is_some());
    }

    #[test]
    fn empty_store_loads_defaults() {
        let store = InMemoryPreferenceStore::new();

        let config = ReminderConfig::load(&store, ReminderFireTime::default());

        assert!(!config.enabled);
        assert_eq!(config.fire_at.hour(), 20);
        assert_eq!(config.fire_at.minute(), 0);
    }

    #[test]
    fn corrupt_time_falls_back_to_defaults_as_a_pair() {
        let store = InMemoryPreferenceStore::new();
        store
            .set_all(PreferenceUpdate {
                enabled: Some(true),
                hour: Some(7),
                minute: Some(75),
            })
            .unwrap();

        let config = ReminderConfig::load(&store, ReminderFireTime::default());

        assert!(config.enabled);
        assert_eq!(config.fire_at, ReminderFireTime::default());
    }

    #[test]
    fn request_codes_are_distinct() {
        assert_ne!(
            AlarmKind::Reminder.request_code(),
            AlarmKind::SelfReschedule.request_code()
        );
    }
}
