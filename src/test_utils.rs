use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};

use chrono::{DateTime, TimeDelta, TimeZone};
use chrono_tz::Tz;

use crate::{
    alarm::AlarmScheduler,
    clock::Clock,
    permission::SettingsPermissionOracle,
    preferences::InMemoryPreferenceStore,
    reminder::{AlarmKind, AlarmPrecision, PendingAlarm},
    scheduling::ReminderScheduler,
    settings::PermissionSettings,
};

pub struct FixedClock {
    now: Mutex<DateTime<Tz>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Tz>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Tz>) {
        *self.now.lock().unwrap() = now;
    }

    pub fn advance(&self, delta: TimeDelta) {
        let mut now = self.now.lock().unwrap();
        *now += delta;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Tz> {
        *self.now.lock().unwrap()
    }
}

/// Keeps registrations in memory and records every call.
#[derive(Default)]
pub struct RecordingAlarmScheduler {
    pending: Mutex<HashMap<AlarmKind, PendingAlarm>>,
    registrations: Mutex<Vec<PendingAlarm>>,
    failing: Mutex<HashSet<AlarmKind>>,
}

impl RecordingAlarmScheduler {
    pub fn fail_on(&self, kind: AlarmKind) {
        self.failing.lock().unwrap().insert(kind);
    }

    pub fn registrations(&self) -> Vec<PendingAlarm> {
        self.registrations.lock().unwrap().clone()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    /// Drops every registration, as a device restart would.
    pub fn reboot(&self) {
        self.pending.lock().unwrap().clear();
    }

    /// Consumes a registration as if it had matured.
    pub fn fire(&self, kind: AlarmKind) -> Option<PendingAlarm> {
        self.pending.lock().unwrap().remove(&kind)
    }
}

impl AlarmScheduler for RecordingAlarmScheduler {
    fn schedule_absolute(
        &self,
        kind: AlarmKind,
        trigger_epoch_millis: i64,
        precision: AlarmPrecision,
    ) -> anyhow::Result<()> {
        if self.failing.lock().unwrap().contains(&kind) {
            anyhow::bail!("Security exception registering {kind}");
        }

        let alarm = PendingAlarm {
            kind,
            trigger_epoch_millis,
            precision,
        };
        self.registrations.lock().unwrap().push(alarm);
        self.pending.lock().unwrap().insert(kind, alarm);
        Ok(())
    }

    fn cancel(&self, kind: AlarmKind) {
        self.pending.lock().unwrap().remove(&kind);
    }

    fn pending(&self, kind: AlarmKind) -> Option<PendingAlarm> {
        self.pending.lock().unwrap().get(&kind).copied()
    }
}

pub fn permissions(notifications_enabled: bool, exact_alarms_allowed: bool) -> SettingsPermissionOracle {
    SettingsPermissionOracle::new(&PermissionSettings {
        notifications_enabled,
        channel_importance: None,
        exact_alarms_allowed,
    })
}

pub fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Tz> {
    chrono_tz::UTC
        .with_ymd_and_hms(y, mo, d, h, mi, s)
        .single()
        .unwrap()
}

pub struct TestContext {
    pub preferences: Arc<InMemoryPreferenceStore>,
    pub permissions: Arc<SettingsPermissionOracle>,
    pub alarms: Arc<RecordingAlarmScheduler>,
    pub clock: Arc<FixedClock>,
    pub scheduler: Arc<ReminderScheduler>,
}

impl TestContext {
    pub fn new(now: DateTime<Tz>) -> Self {
        let preferences = Arc::new(InMemoryPreferenceStore::new());
        let permissions = Arc::new(permissions(true, true));
        let alarms = Arc::new(RecordingAlarmScheduler::default());
        let clock = Arc::new(FixedClock::new(now));
        let scheduler = Arc::new(ReminderScheduler::new(
            preferences.clone(),
            permissions.clone(),
            alarms.clone(),
            clock.clone(),
        ));

        Self {
            preferences,
            permissions,
            alarms,
            clock,
            scheduler,
        }
    }

    pub fn pending(&self, kind: AlarmKind) -> Option<DateTime<Tz>> {
        self.alarms.pending(kind).map(|alarm| {
            chrono_tz::UTC
                .timestamp_millis_opt(alarm.trigger_epoch_millis)
                .single()
                .unwrap()
        })
    }
}
