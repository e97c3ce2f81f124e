use std::{sync::Arc, time::Duration};

use async_trait::async_trait;

use crate::settings::NotificationSettings;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

impl From<&NotificationSettings> for Notification {
    fn from(settings: &NotificationSettings) -> Self {
        Self {
            title: settings.title.clone(),
            body: settings.body.clone(),
        }
    }
}

#[async_trait]
pub trait NotificationSurface: Send + Sync + 'static {
    async fn post(&self, notification: &Notification) -> anyhow::Result<()>;
}

/// Posts notifications to the log.
pub struct LogNotificationSurface;

#[async_trait]
impl NotificationSurface for LogNotificationSurface {
    async fn post(&self, notification: &Notification) -> anyhow::Result<()> {
        log::info!("🔔 {}: {}", notification.title, notification.body);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Posted,
    Failed,
    Panicked,
    TimedOut,
}

/// Turns a matured `Reminder` alarm into a notification.
///
/// Never fails past its boundary: errors, panics and hangs in the surface
/// are logged and reported as a [`DeliveryOutcome`].
pub struct ReminderDeliveryHandler {
    surface: Arc<dyn NotificationSurface>,
    notification: Notification,
    post_timeout: Duration,
}

impl ReminderDeliveryHandler {
    pub fn new(
        surface: Arc<dyn NotificationSurface>,
        notification: Notification,
        post_timeout: Duration,
    ) -> Self {
        Self {
            surface,
            notification,
            post_timeout,
        }
    }

    pub async fn on_reminder_fired(&self) -> DeliveryOutcome {
        let surface = Arc::clone(&self.surface);
        let notification = self.notification.clone();
        let mut task = tokio::spawn(async move { surface.post(&notification).await });

        match tokio::time::timeout(self.post_timeout, &mut task).await {
            Ok(Ok(Ok(()))) => {
                log::info!("Reminder notification posted");
                DeliveryOutcome::Posted
            }
            Ok(Ok(Err(e))) => {
                log::error!("Could not post reminder notification: {:#}", e);
                DeliveryOutcome::Failed
            }
            Ok(Err(join_error)) => {
                log::error!("Notification surface crashed: {}", join_error);
                DeliveryOutcome::Panicked
            }
            Err(_) => {
                task.abort();
                log::warn!(
                    "Posting reminder notification timed out after {:?}",
                    self.post_timeout
                );
                DeliveryOutcome::TimedOut
            }
        }
    }
}
