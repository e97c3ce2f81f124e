use std::sync::{
    PoisonError, RwLock,
    atomic::{AtomicBool, Ordering},
};

use serde::Deserialize;

use crate::settings::PermissionSettings;

pub trait PermissionOracle: Send + Sync {
    /// Notifications are permitted and not suppressed by the user.
    fn notifications_allowed_at_system_level(&self) -> bool;
    fn can_schedule_exact_alarms(&self) -> bool;
}

/// Importance of the notification channel on platforms that have channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelImportance {
    None,
    Min,
    Low,
    Default,
    High,
}

/// Channel importance decides when the platform has channels; the global
/// switch decides otherwise. Both must allow delivery.
pub fn notifications_allowed(
    notifications_enabled: bool,
    channel_importance: Option<ChannelImportance>,
) -> bool {
    match channel_importance {
        Some(importance) => notifications_enabled && importance != ChannelImportance::None,
        None => notifications_enabled,
    }
}

/// Permission state seeded from settings and adjustable at runtime.
pub struct SettingsPermissionOracle {
    notifications_enabled: AtomicBool,
    channel_importance: RwLock<Option<ChannelImportance>>,
    exact_alarms_allowed: AtomicBool,
}

impl SettingsPermissionOracle {
    pub fn new(settings: &PermissionSettings) -> Self {
        Self {
            notifications_enabled: AtomicBool::new(settings.notifications_enabled),
            channel_importance: RwLock::new(settings.channel_importance),
            exact_alarms_allowed: AtomicBool::new(settings.exact_alarms_allowed),
        }
    }

    pub fn set_notifications_enabled(&self, enabled: bool) {
        self.notifications_enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn set_channel_importance(&self, importance: Option<ChannelImportance>) {
        *self
            .channel_importance
            .write()
            .unwrap_or_else(PoisonError::into_inner) = importance;
    }

    pub fn set_exact_alarms_allowed(&self, allowed: bool) {
        self.exact_alarms_allowed.store(allowed, Ordering::SeqCst);
    }
}

impl PermissionOracle for SettingsPermissionOracle {
    fn notifications_allowed_at_system_level(&self) -> bool {
        let importance = *self
            .channel_importance
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        notifications_allowed(self.notifications_enabled.load(Ordering::SeqCst), importance)
    }

    fn can_schedule_exact_alarms(&self) -> bool {
        self.exact_alarms_allowed.load(Ordering::SeqCst)
    }
}
