use std::sync::{PoisonError, RwLock};

use super::{
    PreferenceKey, PreferenceMap, PreferenceStore, PreferenceUpdate, apply_update, read_bool,
    read_int,
};

#[derive(Default)]
pub struct InMemoryPreferenceStore {
    store: RwLock<PreferenceMap>,
}

impl InMemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for InMemoryPreferenceStore {
    fn get_bool(&self, key: PreferenceKey, default: bool) -> bool {
        let store = self.store.read().unwrap_or_else(PoisonError::into_inner);
        read_bool(&store, key, default)
    }

    fn get_int(&self, key: PreferenceKey, default: i64) -> i64 {
        let store = self.store.read().unwrap_or_else(PoisonError::into_inner);
        read_int(&store, key, default)
    }

    fn set_all(&self, update: PreferenceUpdate) -> anyhow::Result<()> {
        let mut store = self.store.write().unwrap_or_else(PoisonError::into_inner);
        apply_update(&mut store, update);
        Ok(())
    }

    fn contains(&self, key: PreferenceKey) -> bool {
        let store = self.store.read().unwrap_or_else(PoisonError::into_inner);
        store.contains_key(key.as_str())
    }
}
