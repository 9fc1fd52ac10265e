use std::{
    env, fs,
    path::{Path, PathBuf},
};

use mouser_engine::ClickConfig;
use ron::{Options, extensions::Extensions, ser::PrettyConfig};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    Error, Result,
    profile::{Profile, RawProfile, new_id, now_ms, truncate_name},
};

/// Default store location: `~/.mouser/profiles.ron`.
pub fn default_profiles_path() -> PathBuf {
    let mut p = PathBuf::from(env::var_os("HOME").unwrap_or_default());
    p.push(".mouser");
    p.push("profiles.ron");
    p
}

/// File shape as read.
#[derive(Deserialize)]
struct LoadedFile {
    /// Entries, normalized individually.
    #[serde(default)]
    profiles: Vec<RawProfile>,
}

/// File shape as written.
#[derive(Serialize)]
struct SavedFile<'a> {
    /// Entries in storage order.
    profiles: &'a [Profile],
}

/// Profiles backed by one RON file.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    /// Backing file.
    path: PathBuf,
    /// Entries in storage order.
    profiles: Vec<Profile>,
}

impl ProfileStore {
    /// An empty store that will save to `path`.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            profiles: Vec::new(),
        }
    }

    /// Load `path`. A missing file is an empty store; an unreadable or
    /// malformed one is logged and treated as empty.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut store = Self::empty(path.clone());
        let text = match fs::read_to_string(&path) {
            Ok(t) => t,
            Err(e) => {
                if path.exists() {
                    warn!(path = %path.display(), error = %e, "profiles_unreadable");
                }
                return store;
            }
        };
        let options = Options::default().with_default_extension(Extensions::IMPLICIT_SOME);
        let file: LoadedFile = match options.from_str(&text) {
            Ok(f) => f,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "profiles_malformed");
                return store;
            }
        };
        let now = now_ms();
        store.profiles = file.profiles.into_iter().filter_map(|r| r.normalize(now)).collect();
        debug!(path = %path.display(), count = store.profiles.len(), "profiles_loaded");
        store
    }

    /// Backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the store as pretty RON, creating parent directories.
    pub fn save(&self) -> Result<()> {
        let text = ron::ser::to_string_pretty(
            &SavedFile {
                profiles: &self.profiles,
            },
            PrettyConfig::new(),
        )?;
        let write_err = |source| Error::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        fs::write(&self.path, text).map_err(write_err)?;
        debug!(path = %self.path.display(), count = self.profiles.len(), "profiles_saved");
        Ok(())
    }

    /// Number of profiles.
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Whether the store holds no profiles.
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Profiles, most recently saved first.
    pub fn list(&self) -> Vec<&Profile> {
        let mut v: Vec<&Profile> = self.profiles.iter().collect();
        v.sort_by(|a, b| b.updated_at_ms.cmp(&a.updated_at_ms));
        v
    }

    /// Profile with exactly this id.
    pub fn get(&self, id: &str) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.id == id)
    }

    /// Look up by id, then exact name, then case-insensitive name.
    pub fn find(&self, id_or_name: &str) -> Option<&Profile> {
        let needle = id_or_name.trim();
        self.get(needle)
            .or_else(|| self.profiles.iter().find(|p| p.name == needle))
            .or_else(|| {
                self.profiles
                    .iter()
                    .find(|p| p.name.to_lowercase() == needle.to_lowercase())
            })
    }

    /// Create or replace a profile from `config`, stamped with the current time.
    pub fn upsert(&mut self, id: Option<&str>, name: &str, config: &ClickConfig) -> Result<&Profile> {
        self.upsert_at(id, name, config, now_ms())
    }

    /// [`ProfileStore::upsert`] with an explicit timestamp.
    ///
    /// `id` names the profile to replace; an unknown id is created as given
    /// and `None` generates a fresh one.
    pub fn upsert_at(
        &mut self,
        id: Option<&str>,
        name: &str,
        config: &ClickConfig,
        now_ms: u64,
    ) -> Result<&Profile> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::EmptyName);
        }
        let id = id.map_or_else(|| new_id(now_ms), str::to_string);
        let profile = Profile {
            id: id.clone(),
            name: truncate_name(name),
            x: config.x(),
            y: config.y(),
            interval_ms: config.interval_ms(),
            key: config.key().to_string(),
            updated_at_ms: now_ms,
        };
        let idx = match self.profiles.iter().position(|p| p.id == id) {
            Some(i) => {
                self.profiles[i] = profile;
                i
            }
            None => {
                self.profiles.push(profile);
                self.profiles.len() - 1
            }
        };
        debug!(id = %id, "profile_upserted");
        Ok(&self.profiles[idx])
    }

    /// Remove and return the profile with `id`.
    pub fn remove(&mut self, id: &str) -> Result<Profile> {
        let idx = self
            .profiles
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        Ok(self.profiles.remove(idx))
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn cfg(x: i32) -> ClickConfig {
        ClickConfig::from_parts(x, x, 100, "a")
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = TempDir::new().expect("tempdir");
        let store = ProfileStore::load(dir.path().join("nope.ron"));
        assert!(store.is_empty());
    }

    #[test]
    fn malformed_file_is_empty() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("profiles.ron");
        fs::write(&path, "this is [ not ron").expect("write");
        assert!(ProfileStore::load(&path).is_empty());
    }

    #[test]
    fn save_then_load_preserves_profiles() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("nested").join("profiles.ron");
        let mut store = ProfileStore::empty(&path);
        store.upsert_at(None, "  work  ", &cfg(1), 10).expect("upsert");
        store.upsert_at(Some("fixed-id"), "home", &cfg(2), 20).expect("upsert");
        store.save().expect("save");

        let loaded = ProfileStore::load(&path);
        assert_eq!(loaded.len(), 2);
        let names: Vec<&str> = loaded.list().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["home", "work"]);
        assert_eq!(loaded.get("fixed-id").map(|p| p.x), Some(2));
    }

    #[test]
    fn tolerant_load_normalizes_entries() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("profiles.ron");
        fs::write(
            &path,
            r#"(profiles: [
                (id: "1-a", name: "fast", x: 5, y: 6, interval_ms: 2, key: "enter", updated_at_ms: 9),
                (id: "2-b", x: 1, y: 1),
                (name: "bare"),
            ])"#,
        )
        .expect("write");
        let store = ProfileStore::load(&path);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("1-a").map(|p| p.interval_ms), Some(10));
        let bare = store.find("BARE").expect("case-insensitive name");
        assert_eq!(bare.interval_ms, 100);
        assert!(!bare.id.is_empty());
    }

    #[test]
    fn upsert_replaces_in_place_and_requires_name() {
        let mut store = ProfileStore::empty("unused.ron");
        let id = store.upsert_at(None, "a", &cfg(1), 1).expect("insert").id.clone();
        store.upsert_at(Some(&id), "a2", &cfg(9), 2).expect("replace");
        assert_eq!(store.len(), 1);
        assert_eq!(store.find(&id).map(|p| (p.name.as_str(), p.x)), Some(("a2", 9)));
        assert!(matches!(store.upsert_at(None, "   ", &cfg(1), 3), Err(Error::EmptyName)));
    }

    #[test]
    fn remove_unknown_is_not_found() {
        let mut store = ProfileStore::empty("unused.ron");
        store.upsert_at(Some("x"), "x", &cfg(1), 1).expect("insert");
        assert!(matches!(store.remove("y"), Err(Error::NotFound(_))));
        assert_eq!(store.remove("x").expect("remove").name, "x");
        assert!(store.is_empty());
    }
}
