mod file_store;
mod memory_store;

pub use file_store::JsonFilePreferenceStore;
pub use memory_store::InMemoryPreferenceStore;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PreferenceKey {
    Enabled,
    Hour,
    Minute,
}

impl PreferenceKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            PreferenceKey::Enabled => "reminder_enabled",
            PreferenceKey::Hour => "reminder_hour",
            PreferenceKey::Minute => "reminder_minute",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PreferenceValue {
    Bool(bool),
    Int(i64),
}

/// Fields left as `None` keep their stored value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PreferenceUpdate {
    pub enabled: Option<bool>,
    pub hour: Option<u32>,
    pub minute: Option<u32>,
}

impl PreferenceUpdate {
    pub fn enabled(enabled: bool) -> Self {
        Self {
            enabled: Some(enabled),
            ..Default::default()
        }
    }

    pub fn time(hour: u32, minute: u32) -> Self {
        Self {
            hour: Some(hour),
            minute: Some(minute),
            ..Default::default()
        }
    }
}

/// Durable key/value storage for the reminder settings.
///
/// Each `set_all` call is applied as one write: readers see either all of
/// the update or none of it.
pub trait PreferenceStore: Send + Sync {
    fn get_bool(&self, key: PreferenceKey, default: bool) -> bool;
    fn get_int(&self, key: PreferenceKey, default: i64) -> i64;
    fn set_all(&self, update: PreferenceUpdate) -> anyhow::Result<()>;
    fn contains(&self, key: PreferenceKey) -> bool;
}

type PreferenceMap = HashMap<String, PreferenceValue>;

fn apply_update(map: &mut PreferenceMap, update: PreferenceUpdate) {
    if let Some(enabled) = update.enabled {
        map.insert(
            PreferenceKey::Enabled.as_str().to_owned(),
            PreferenceValue::Bool(enabled),
        );
    }
    if let Some(hour) = update.hour {
        map.insert(
            PreferenceKey::Hour.as_str().to_owned(),
            PreferenceValue::Int(hour.into()),
        );
    }
    if let Some(minute) = update.minute {
        map.insert(
            PreferenceKey::Minute.as_str().to_owned(),
            PreferenceValue::Int(minute.into()),
        );
    }
}

fn read_bool(map: &PreferenceMap, key: PreferenceKey, default: bool) -> bool {
    match map.get(key.as_str()) {
        Some(PreferenceValue::Bool(value)) => *value,
        Some(other) => {
            log::warn!(
                "Preference has unexpected type, using default. [key = {}, value = {:?}]",
                key.as_str(),
                other
            );
            default
        }
        None => default,
    }
}

fn read_int(map: &PreferenceMap, key: PreferenceKey, default: i64) -> i64 {
    match map.get(key.as_str()) {
        Some(PreferenceValue::Int(value)) => *value,
        Some(other) => {
            log::warn!(
                "Preference has unexpected type, using default. [key = {}, value = {:?}]",
                key.as_str(),
                other
            );
            default
        }
        None => default,
    }
}
