use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{
    alarm::TokioAlarmScheduler,
    boot::BootRecoveryHandler,
    clock::{Clock, SystemClock},
    delivery::{LogNotificationSurface, Notification, NotificationSurface, ReminderDeliveryHandler},
    permission::SettingsPermissionOracle,
    preferences::JsonFilePreferenceStore,
    reminder::AlarmKind,
    scheduling::{ReminderScheduler, ScheduleOutcome},
    settings::Settings,
};

/// Routes platform events to the reminder handlers.
pub struct ReminderService {
    scheduler: Arc<ReminderScheduler>,
    delivery: ReminderDeliveryHandler,
    boot: BootRecoveryHandler,
}

impl ReminderService {
    pub fn new(scheduler: Arc<ReminderScheduler>, delivery: ReminderDeliveryHandler) -> Self {
        let boot = BootRecoveryHandler::new(Arc::clone(&scheduler));
        Self {
            scheduler,
            delivery,
            boot,
        }
    }

    /// Wires the file-backed store, settings-driven permissions and tokio
    /// timers. Must be called from within a tokio runtime.
    pub fn from_settings(
        settings: &Settings,
    ) -> anyhow::Result<(Self, mpsc::UnboundedReceiver<AlarmKind>)> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock::new(settings.timezone()?));
        let preferences = Arc::new(JsonFilePreferenceStore::open(&settings.preferences.path)?);
        let permissions = Arc::new(SettingsPermissionOracle::new(&settings.permissions));
        let (alarms, fired) =
            TokioAlarmScheduler::new(Arc::clone(&clock), settings.inexact_window())?;

        let scheduler = ReminderScheduler::new(preferences, permissions, Arc::new(alarms), clock)
            .with_defaults(settings.default_fire_time()?)
            .with_self_reschedule_offset(settings.self_reschedule_offset()?);

        let surface: Arc<dyn NotificationSurface> = Arc::new(LogNotificationSurface);
        let delivery = ReminderDeliveryHandler::new(
            surface,
            Notification::from(&settings.notification),
            settings.post_timeout(),
        );

        Ok((Self::new(Arc::new(scheduler), delivery), fired))
    }

    pub fn scheduler(&self) -> &ReminderScheduler {
        &self.scheduler
    }

    pub async fn on_alarm_fired(&self, kind: AlarmKind) {
        log::info!("Alarm fired. [kind = {}]", kind);
        match kind {
            AlarmKind::Reminder => {
                self.delivery.on_reminder_fired().await;
            }
            AlarmKind::SelfReschedule => {
                self.scheduler.schedule_next();
            }
        }
    }

    pub fn on_device_boot(&self) -> ScheduleOutcome {
        self.boot.on_device_boot()
    }

    /// Dispatches matured alarms until `shutdown` is cancelled or every
    /// sender is gone.
    pub async fn run(
        &self,
        mut fired: mpsc::UnboundedReceiver<AlarmKind>,
        shutdown: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    log::info!("Reminder service shutting down");
                    break;
                }
                kind = fired.recv() => match kind {
                    Some(kind) => self.on_alarm_fired(kind).await,
                    None => {
                        log::info!("Alarm channel closed, stopping reminder service");
                        break;
                    }
                }
            }
        }
    }
}
