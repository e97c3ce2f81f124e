//! Daily reminder scheduling.
//!
//! Keeps one reminder alarm and one self-reschedule alarm registered for the
//! next occurrence of a configured time of day, re-arming itself every day and
//! after restarts.

pub mod alarm;
pub mod boot;
pub mod clock;
pub mod delivery;
pub mod error;
pub mod permission;
pub mod preferences;
pub mod reminder;
pub mod scheduling;
pub mod service;
pub mod settings;

#[cfg(test)]
pub(crate) mod test_utils;

pub use error::ReminderError;
pub use reminder::{AlarmKind, AlarmPrecision, PendingAlarm, ReminderConfig, ReminderFireTime};
pub use scheduling::{DisarmReason, ReminderScheduler, ScheduleOutcome};
pub use service::ReminderService;
pub use settings::Settings;
