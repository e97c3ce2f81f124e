use std::{path::PathBuf, time::Duration};

use anyhow::Context;
use chrono::TimeDelta;
use chrono_tz::Tz;
use config::{Config, ConfigError, Environment, File, builder::DefaultState};
use serde::Deserialize;

use crate::{
    permission::ChannelImportance,
    reminder::{DEFAULT_HOUR, DEFAULT_MINUTE, ReminderFireTime},
};

#[derive(Deserialize, Debug, Clone)]
pub struct ReminderSettings {
    pub default_hour: u32,
    pub default_minute: u32,
    pub self_reschedule_offset_secs: u64,
}

#[derive(Deserialize, Debug, Clone)]
pub struct PreferenceSettings {
    pub path: PathBuf,
}

#[derive(Deserialize, Debug, Clone)]
pub struct PermissionSettings {
    pub notifications_enabled: bool,
    #[serde(default)]
    pub channel_importance: Option<ChannelImportance>,
    pub exact_alarms_allowed: bool,
}

#[derive(Deserialize, Debug, Clone)]
pub struct AlarmSettings {
    pub inexact_window_secs: u64,
}

#[derive(Deserialize, Debug, Clone)]
pub struct NotificationSettings {
    pub title: String,
    pub body: String,
    pub post_timeout_secs: u64,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Settings {
    pub timezone: String,
    pub reminder: ReminderSettings,
    pub preferences: PreferenceSettings,
    pub permissions: PermissionSettings,
    pub alarms: AlarmSettings,
    pub notification: NotificationSettings,
}

impl Settings {
    /// `appsettings`, then `appsettings.local`, then `APP__`-prefixed
    /// environment variables, each overriding the previous layer.
    pub fn load() -> Result<Self, ConfigError> {
        Self::builder()?
            .add_source(File::with_name("appsettings").required(false))
            .add_source(File::with_name("appsettings.local").required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    pub fn with_defaults() -> Result<Self, ConfigError> {
        Self::builder()?.build()?.try_deserialize()
    }

    fn builder() -> Result<config::ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("timezone", "UTC")?
            .set_default("reminder.default_hour", DEFAULT_HOUR as i64)?
            .set_default("reminder.default_minute", DEFAULT_MINUTE as i64)?
            .set_default("reminder.self_reschedule_offset_secs", 60)?
            .set_default("preferences.path", "reminder_prefs.json")?
            .set_default("permissions.notifications_enabled", true)?
            .set_default("permissions.exact_alarms_allowed", true)?
            .set_default("alarms.inexact_window_secs", 0)?
            .set_default("notification.title", "Daily reminder")?
            .set_default(
                "notification.body",
                "Don't forget to record today's income and expenses.",
            )?
            .set_default("notification.post_timeout_secs", 5)
    }

    pub fn timezone(&self) -> anyhow::Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| anyhow::anyhow!("Unknown timezone {}: {e}", self.timezone))
    }

    pub fn default_fire_time(&self) -> anyhow::Result<ReminderFireTime> {
        ReminderFireTime::from_hm(self.reminder.default_hour, self.reminder.default_minute)
            .with_context(|| {
                format!(
                    "Default reminder time is out of range [hour = {}, minute = {}]",
                    self.reminder.default_hour, self.reminder.default_minute
                )
            })
    }

    pub fn self_reschedule_offset(&self) -> anyhow::Result<TimeDelta> {
        let secs = i64::try_from(self.reminder.self_reschedule_offset_secs)?;
        TimeDelta::try_seconds(secs).context("Self-reschedule offset is too large")
    }

    pub fn inexact_window(&self) -> Duration {
        Duration::from_secs(self.alarms.inexact_window_secs)
    }

    pub fn post_timeout(&self) -> Duration {
        Duration::from_secs(self.notification.post_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_describe_an_evening_reminder() {
        let settings = Settings::with_defaults().unwrap();

        assert_eq!(settings.timezone().unwrap(), Tz::UTC);
        assert_eq!(
            settings.default_fire_time().unwrap(),
            ReminderFireTime::from_hm(20, 0).unwrap()
        );
        assert_eq!(settings.self_reschedule_offset().unwrap(), TimeDelta::minutes(1));
        assert!(settings.permissions.notifications_enabled);
        assert_eq!(settings.permissions.channel_importance, None);
        assert_eq!(settings.inexact_window(), Duration::ZERO);
    }

    #[test]
    fn unknown_timezone_is_rejected() {
        let mut settings = Settings::with_defaults().unwrap();
        settings.timezone = "Mars/Olympus_Mons".to_owned();

        assert!(settings.timezone().is_err());
    }

    #[test]
    fn out_of_range_default_time_is_rejected() {
        let mut settings = Settings::with_defaults().unwrap();
        settings.reminder.default_hour = 24;

        assert!(settings.default_fire_time().is_err());
    }

    #[test]
    fn channel_importance_deserializes_lowercase() {
        let settings: Settings = Settings::builder()
            .unwrap()
            .set_override("permissions.channel_importance", "none")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(
            settings.permissions.channel_importance,
            Some(ChannelImportance::None)
        );
    }
}
