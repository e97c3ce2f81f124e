use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::{PoisonError, RwLock},
};

use anyhow::Context;

use super::{
    PreferenceKey, PreferenceMap, PreferenceStore, PreferenceUpdate, apply_update, read_bool,
    read_int,
};

/// Preference store persisted as a flat JSON object.
///
/// The file is rewritten through a temporary sibling and renamed into place,
/// so an interrupted write leaves the previous contents intact.
pub struct JsonFilePreferenceStore {
    path: PathBuf,
    cache: RwLock<PreferenceMap>,
}

impl JsonFilePreferenceStore {
    pub fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let cache = match fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => PreferenceMap::new(),
            Ok(contents) => serde_json::from_str(&contents)
                .with_context(|| format!("Malformed preference file {}", path.display()))?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::info!(
                    "Preference file does not exist yet, starting empty. [path = {}]",
                    path.display()
                );
                PreferenceMap::new()
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Could not read preference file {}", path.display()));
            }
        };

        Ok(Self {
            path,
            cache: RwLock::new(cache),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, map: &PreferenceMap) -> anyhow::Result<()> {
        let contents = serde_json::to_vec_pretty(map)?;
        let tmp_path = self.path.with_extension("json.tmp");

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Could not create {}", parent.display()))?;
        }

        let mut file = fs::File::create(&tmp_path)
            .with_context(|| format!("Could not create {}", tmp_path.display()))?;
        file.write_all(&contents)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("Could not replace {}", self.path.display()))?;
        Ok(())
    }
}

impl PreferenceStore for JsonFilePreferenceStore {
    fn get_bool(&self, key: PreferenceKey, default: bool) -> bool {
        let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
        read_bool(&cache, key, default)
    }

    fn get_int(&self, key: PreferenceKey, default: i64) -> i64 {
        let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
        read_int(&cache, key, default)
    }

    fn set_all(&self, update: PreferenceUpdate) -> anyhow::Result<()> {
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = cache.clone();
        apply_update(&mut next, update);

        // The in-memory view only changes once the file is durable.
        self.persist(&next)?;
        *cache = next;
        Ok(())
    }

    fn contains(&self, key: PreferenceKey) -> bool {
        let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
        cache.contains_key(key.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");

        let store = JsonFilePreferenceStore::open(&path).unwrap();
        store
            .set_all(PreferenceUpdate {
                enabled: Some(true),
                hour: Some(9),
                minute: Some(30),
            })
            .unwrap();
        drop(store);

        let reopened = JsonFilePreferenceStore::open(&path).unwrap();
        assert!(reopened.get_bool(PreferenceKey::Enabled, false));
        assert_eq!(reopened.get_int(PreferenceKey::Hour, 0), 9);
        assert_eq!(reopened.get_int(PreferenceKey::Minute, 0), 30);
    }

    #[test]
    fn missing_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFilePreferenceStore::open(dir.path().join("absent.json")).unwrap();

        assert!(!store.contains(PreferenceKey::Enabled));
        assert!(!store.path().exists());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(JsonFilePreferenceStore::open(&path).is_err());
    }

    #[test]
    fn failed_write_leaves_cache_untouched() {
        let dir = tempfile::tempdir().unwrap();
        // A directory in place of the target file makes the rename fail.
        let path = dir.path().join("prefs.json");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("keep"), "").unwrap();
        let store = JsonFilePreferenceStore {
            path: path.clone(),
            cache: RwLock::new(PreferenceMap::new()),
        };

        assert!(store.set_all(PreferenceUpdate::enabled(true)).is_err());
        assert!(!store.contains(PreferenceKey::Enabled));
    }
}
