mod target_time;

use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, TimeDelta};
use chrono_tz::Tz;

use crate::{
    alarm::AlarmScheduler,
    clock::Clock,
    error::ReminderError,
    permission::PermissionOracle,
    preferences::{PreferenceStore, PreferenceUpdate},
    reminder::{AlarmKind, AlarmPrecision, ReminderConfig, ReminderFireTime},
};

pub(crate) use target_time::get_target_datetime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisarmReason {
    Disabled,
    PermissionRevoked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleOutcome {
    /// Nothing is pending; any previous registrations were removed.
    Disarmed(DisarmReason),
    Armed {
        fire_at: DateTime<Tz>,
        precision: AlarmPrecision,
    },
    /// The alarm scheduler refused a registration.
    Faulted,
}

/// Keeps one `Reminder` alarm and one `SelfReschedule` alarm registered for
/// the next occurrence of the configured time while reminders are enabled.
///
/// Every entry point converges on the same pending pair no matter how often
/// or from where it is called, so callers never need to coordinate.
pub struct ReminderScheduler {
    preferences: Arc<dyn PreferenceStore>,
    permissions: Arc<dyn PermissionOracle>,
    alarms: Arc<dyn AlarmScheduler>,
    clock: Arc<dyn Clock>,
    defaults: ReminderFireTime,
    self_reschedule_offset: TimeDelta,
}

impl ReminderScheduler {
    pub fn new(
        preferences: Arc<dyn PreferenceStore>,
        permissions: Arc<dyn PermissionOracle>,
        alarms: Arc<dyn AlarmScheduler>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            preferences,
            permissions,
            alarms,
            clock,
            defaults: ReminderFireTime::default(),
            self_reschedule_offset: TimeDelta::minutes(1),
        }
    }

    pub fn with_defaults(mut self, defaults: ReminderFireTime) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn with_self_reschedule_offset(mut self, offset: TimeDelta) -> Self {
        self.self_reschedule_offset = offset;
        self
    }

    pub fn config(&self) -> ReminderConfig {
        ReminderConfig::load(self.preferences.as_ref(), self.defaults)
    }

    pub fn alarms(&self) -> &dyn AlarmScheduler {
        self.alarms.as_ref()
    }

    /// Returns `false` when enabling is refused or the flag could not be
    /// persisted. A refused enable changes nothing.
    pub fn set_enabled(&self, enabled: bool) -> bool {
        match self.try_set_enabled(enabled) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Could not change reminder state. [enabled = {}, error = {}]", enabled, e);
                false
            }
        }
    }

    pub fn try_set_enabled(&self, enabled: bool) -> Result<(), ReminderError> {
        if enabled && !self.permissions.notifications_allowed_at_system_level() {
            return Err(ReminderError::PermissionDenied);
        }

        self.preferences
            .set_all(PreferenceUpdate::enabled(enabled))
            .map_err(ReminderError::PersistenceFault)?;

        if enabled {
            log::info!("Reminders enabled");
            self.schedule_next();
        } else {
            log::info!("Reminders disabled");
            self.cancel();
        }

        Ok(())
    }

    pub fn set_time(&self, hour: i32, minute: i32) -> Result<(), ReminderError> {
        let fire_at = u32::try_from(hour)
            .ok()
            .zip(u32::try_from(minute).ok())
            .and_then(|(hour, minute)| ReminderFireTime::from_hm(hour, minute))
            .ok_or(ReminderError::InvalidArgument { hour, minute })?;

        self.preferences
            .set_all(PreferenceUpdate::time(fire_at.hour(), fire_at.minute()))
            .map_err(ReminderError::PersistenceFault)?;

        log::info!("Reminder time set to {}", fire_at);

        if self.config().enabled {
            self.schedule_next();
        }

        Ok(())
    }

    /// Re-derives the pending alarms from the persisted configuration.
    ///
    /// Safe to call from any trigger: enabling, a time change, the
    /// self-reschedule alarm, or boot recovery. Registration faults are
    /// logged; a faulted `Reminder` registration leaves the previous one in
    /// place.
    pub fn schedule_next(&self) -> ScheduleOutcome {
        match self.try_schedule_next() {
            Ok(outcome) => outcome,
            Err(e) => {
                log::error!("{}", e);
                ScheduleOutcome::Faulted
            }
        }
    }

    pub fn try_schedule_next(&self) -> Result<ScheduleOutcome, ReminderError> {
        let config = self.config();

        if !config.enabled {
            self.cancel();
            return Ok(ScheduleOutcome::Disarmed(DisarmReason::Disabled));
        }

        if !self.permissions.notifications_allowed_at_system_level() {
            log::warn!("Notifications are no longer permitted, dropping pending alarms");
            self.cancel();
            return Ok(ScheduleOutcome::Disarmed(DisarmReason::PermissionRevoked));
        }

        let now = self.clock.now();
        let fire_at = get_target_datetime(config.fire_at.time(), now)
            .with_context(|| format!("No occurrence of {} after {now}", config.fire_at))
            .map_err(ReminderError::SchedulingFault)?;
        let reschedule_at = fire_at + self.self_reschedule_offset;
        let precision = if self.permissions.can_schedule_exact_alarms() {
            AlarmPrecision::Exact
        } else {
            log::info!("Exact alarms are not permitted, falling back to inexact delivery");
            AlarmPrecision::Inexact
        };

        self.alarms
            .schedule_absolute(AlarmKind::Reminder, fire_at.timestamp_millis(), precision)
            .with_context(|| format!("Reminder alarm for {fire_at}"))
            .map_err(ReminderError::SchedulingFault)?;

        // Without this one the reminder fires once and does not repeat until
        // the next boot or settings change.
        self.alarms
            .schedule_absolute(
                AlarmKind::SelfReschedule,
                reschedule_at.timestamp_millis(),
                precision,
            )
            .with_context(|| format!("Self-reschedule alarm for {reschedule_at}"))
            .map_err(ReminderError::SchedulingFault)?;

        log::info!(
            "Reminder armed. [fire_at = {}, reschedule_at = {}, precision = {:?}]",
            fire_at,
            reschedule_at,
            precision
        );

        Ok(ScheduleOutcome::Armed { fire_at, precision })
    }

    /// Idempotent.
    pub fn cancel(&self) {
        for kind in AlarmKind::ALL {
            self.alarms.cancel(kind);
        }
    }
}
