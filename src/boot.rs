use std::sync::Arc;

use crate::scheduling::{DisarmReason, ReminderScheduler, ScheduleOutcome};

/// Restores the pending alarms after a restart, since registrations do not
/// survive one.
pub struct BootRecoveryHandler {
    scheduler: Arc<ReminderScheduler>,
}

impl BootRecoveryHandler {
    pub fn new(scheduler: Arc<ReminderScheduler>) -> Self {
        Self { scheduler }
    }

    pub fn on_device_boot(&self) -> ScheduleOutcome {
        let config = self.scheduler.config();
        if !config.enabled {
            log::info!("Reminders are disabled, nothing to restore after boot");
            return ScheduleOutcome::Disarmed(DisarmReason::Disabled);
        }

        log::info!("Restoring reminder for {} after boot", config.fire_at);
        self.scheduler.schedule_next()
    }
}
